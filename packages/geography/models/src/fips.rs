//! US state FIPS code lookups for the 50 states + DC.
//!
//! Used to label GEOID-keyed output with a state abbreviation or name.

/// `(fips, abbreviation, name)` for each state, ordered by FIPS code.
const STATES: &[(&str, &str, &str)] = &[
    ("01", "AL", "Alabama"),
    ("02", "AK", "Alaska"),
    ("04", "AZ", "Arizona"),
    ("05", "AR", "Arkansas"),
    ("06", "CA", "California"),
    ("08", "CO", "Colorado"),
    ("09", "CT", "Connecticut"),
    ("10", "DE", "Delaware"),
    ("11", "DC", "District of Columbia"),
    ("12", "FL", "Florida"),
    ("13", "GA", "Georgia"),
    ("15", "HI", "Hawaii"),
    ("16", "ID", "Idaho"),
    ("17", "IL", "Illinois"),
    ("18", "IN", "Indiana"),
    ("19", "IA", "Iowa"),
    ("20", "KS", "Kansas"),
    ("21", "KY", "Kentucky"),
    ("22", "LA", "Louisiana"),
    ("23", "ME", "Maine"),
    ("24", "MD", "Maryland"),
    ("25", "MA", "Massachusetts"),
    ("26", "MI", "Michigan"),
    ("27", "MN", "Minnesota"),
    ("28", "MS", "Mississippi"),
    ("29", "MO", "Missouri"),
    ("30", "MT", "Montana"),
    ("31", "NE", "Nebraska"),
    ("32", "NV", "Nevada"),
    ("33", "NH", "New Hampshire"),
    ("34", "NJ", "New Jersey"),
    ("35", "NM", "New Mexico"),
    ("36", "NY", "New York"),
    ("37", "NC", "North Carolina"),
    ("38", "ND", "North Dakota"),
    ("39", "OH", "Ohio"),
    ("40", "OK", "Oklahoma"),
    ("41", "OR", "Oregon"),
    ("42", "PA", "Pennsylvania"),
    ("44", "RI", "Rhode Island"),
    ("45", "SC", "South Carolina"),
    ("46", "SD", "South Dakota"),
    ("47", "TN", "Tennessee"),
    ("48", "TX", "Texas"),
    ("49", "UT", "Utah"),
    ("50", "VT", "Vermont"),
    ("51", "VA", "Virginia"),
    ("53", "WA", "Washington"),
    ("54", "WV", "West Virginia"),
    ("55", "WI", "Wisconsin"),
    ("56", "WY", "Wyoming"),
];

/// Returns `true` if `fips` is a known state FIPS code.
#[must_use]
pub fn is_state_fips(fips: &str) -> bool {
    STATES.iter().any(|(code, _, _)| *code == fips)
}

/// Two-letter abbreviation for a state FIPS code.
#[must_use]
pub fn state_abbr(fips: &str) -> Option<&'static str> {
    STATES
        .iter()
        .find(|(code, _, _)| *code == fips)
        .map(|(_, abbr, _)| *abbr)
}

/// Full state name for a state FIPS code.
#[must_use]
pub fn state_name(fips: &str) -> Option<&'static str> {
    STATES
        .iter()
        .find(|(code, _, _)| *code == fips)
        .map(|(_, _, name)| *name)
}

/// FIPS code for a two-letter abbreviation (case-insensitive).
#[must_use]
pub fn abbr_to_fips(abbr: &str) -> Option<&'static str> {
    STATES
        .iter()
        .find(|(_, a, _)| a.eq_ignore_ascii_case(abbr))
        .map(|(code, _, _)| *code)
}
