use std::ops::AddAssign;

/// Party affiliation of a registered voter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Party {
    Dem,
    Rep,
    Una,    // Unaffiliated
    Other,  // Every other registered party
}

impl Party {
    pub const COUNT: usize = 4;

    pub const ALL: [Party; Party::COUNT] = [Party::Dem, Party::Rep, Party::Una, Party::Other];

    pub fn code(&self) -> &'static str {
        match self {
            Party::Dem => "DEM",
            Party::Rep => "REP",
            Party::Una => "UNA",
            Party::Other => "OP",
        }
    }

    /// Parse a registration party code. Anything but DEM/REP/UNA folds into `Other`.
    pub fn from_code(code: &str) -> Party {
        match code.trim() {
            "DEM" => Party::Dem,
            "REP" => Party::Rep,
            "UNA" => Party::Una,
            _ => Party::Other,
        }
    }

    #[inline] pub(crate) fn idx(self) -> usize { self as usize }
}

/// Race/ethnicity category. `All`, `Hispanic` and `NonHispanic` are derived aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Race {
    All,
    Hispanic,       // HL
    NonHispanic,    // NL
    Black,
    White,
    Other,          // OR
}

impl Race {
    pub const COUNT: usize = 6;

    pub const ALL: [Race; Race::COUNT] = [
        Race::All,
        Race::Hispanic,
        Race::NonHispanic,
        Race::Black,
        Race::White,
        Race::Other,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Race::All => "ALL",
            Race::Hispanic => "HL",
            Race::NonHispanic => "NL",
            Race::Black => "B",
            Race::White => "W",
            Race::Other => "OR",
        }
    }

    /// Parse a category code as it appears in column names.
    pub fn from_code(code: &str) -> Option<Race> {
        Race::ALL.into_iter().find(|race| race.code() == code.trim())
    }

    /// Map a registration race code. `U` (undesignated) has no census counterpart.
    pub fn from_race_code(code: &str) -> Option<Race> {
        match code.trim() {
            "B" => Some(Race::Black),
            "W" => Some(Race::White),
            "U" | "" => None,
            _ => Some(Race::Other),
        }
    }

    /// Map a registration ethnicity code. `UN` (undesignated) has no census counterpart.
    pub fn from_ethnic_code(code: &str) -> Option<Race> {
        match code.trim() {
            "HL" => Some(Race::Hispanic),
            "NL" => Some(Race::NonHispanic),
            _ => None,
        }
    }

    #[inline] pub(crate) fn idx(self) -> usize { self as usize }
}

/// Registered voter counts per (race, party) cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VoterTally([[u64; Party::COUNT]; Race::COUNT]);

impl VoterTally {
    #[inline]
    pub fn get(&self, race: Race, party: Party) -> u64 { self.0[race.idx()][party.idx()] }

    #[inline]
    pub fn set(&mut self, race: Race, party: Party, voters: u64) { self.0[race.idx()][party.idx()] = voters }

    #[inline]
    pub fn add(&mut self, race: Race, party: Party, voters: u64) { self.0[race.idx()][party.idx()] += voters }

    /// Voters of `party` across all races.
    #[inline] pub fn party_total(&self, party: Party) -> u64 { self.get(Race::All, party) }

    /// Voters of `race` across all parties.
    pub fn race_total(&self, race: Race) -> u64 { self.0[race.idx()].iter().sum() }

    pub fn is_empty(&self) -> bool { self.0.iter().flatten().all(|&n| n == 0) }

    /// Credit one grouped registration row to every category it belongs to:
    /// the `ALL` aggregate, its race, and its ethnicity.
    /// Returns false when the race code has no census counterpart (the row still counts in `ALL`).
    pub fn record(&mut self, race_code: &str, ethnic_code: &str, party: Party, voters: u64) -> bool {
        self.add(Race::All, party, voters);
        if let Some(ethnicity) = Race::from_ethnic_code(ethnic_code) {
            self.add(ethnicity, party, voters);
        }
        match Race::from_race_code(race_code) {
            Some(race) => { self.add(race, party, voters); true }
            None => false,
        }
    }
}

impl AddAssign<&VoterTally> for VoterTally {
    fn add_assign(&mut self, other: &VoterTally) {
        for (row, other_row) in self.0.iter_mut().zip(other.0.iter()) {
            for (cell, other_cell) in row.iter_mut().zip(other_row.iter()) {
                *cell += other_cell;
            }
        }
    }
}

/// Population per race category. Fractional once scaled by an overlap fraction.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Population([f64; Race::COUNT]);

impl Population {
    /// Derive every category from the six census race × ethnicity components.
    pub fn from_components(nl_w: f64, nl_b: f64, nl_o: f64, hl_w: f64, hl_b: f64, hl_o: f64) -> Self {
        let [nl_w, nl_b, nl_o, hl_w, hl_b, hl_o] = [nl_w, nl_b, nl_o, hl_w, hl_b, hl_o].map(|n| n.max(0.0));

        let mut population = Population::default();
        population.set(Race::Hispanic, hl_w + hl_b + hl_o);
        population.set(Race::NonHispanic, nl_w + nl_b + nl_o);
        population.set(Race::All, population.get(Race::Hispanic) + population.get(Race::NonHispanic));
        population.set(Race::Black, nl_b + hl_b);
        population.set(Race::White, nl_w + hl_w);
        population.set(Race::Other, nl_o + hl_o);
        population
    }

    #[inline] pub fn get(&self, race: Race) -> f64 { self.0[race.idx()] }

    #[inline]
    pub fn set(&mut self, race: Race, value: f64) {
        debug_assert!(value >= 0.0, "population must be non-negative");
        self.0[race.idx()] = value
    }

    #[inline] pub fn total(&self) -> f64 { self.get(Race::All) }

    /// Every category multiplied by `fraction`.
    pub fn scaled(&self, fraction: f64) -> Self { Self(self.0.map(|n| n * fraction)) }
}

impl AddAssign<&Population> for Population {
    fn add_assign(&mut self, other: &Population) {
        for (cell, other_cell) in self.0.iter_mut().zip(other.0.iter()) {
            *cell += other_cell;
        }
    }
}
