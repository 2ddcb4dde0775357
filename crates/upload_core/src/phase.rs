use std::fmt;
use std::str::FromStr;

/// Processing mode forwarded to the endpoint as the `phase` form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Phase {
    #[default]
    Arterial,
    Venous,
}

impl Phase {
    pub const ALL: [Phase; 2] = [Phase::Arterial, Phase::Venous];

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Arterial => "arterial",
            Phase::Venous => "venous",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPhase(pub String);

impl fmt::Display for UnknownPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown phase '{}' (expected 'arterial' or 'venous')", self.0)
    }
}

impl std::error::Error for UnknownPhase {}

impl FromStr for Phase {
    type Err = UnknownPhase;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        Phase::ALL
            .into_iter()
            .find(|phase| phase.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownPhase(trimmed.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::Phase;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!(" Venous ".parse::<Phase>(), Ok(Phase::Venous));
        assert_eq!("ARTERIAL".parse::<Phase>(), Ok(Phase::Arterial));
    }

    #[test]
    fn rejects_unknown_labels() {
        let err = "portal".parse::<Phase>().unwrap_err();
        assert!(err.to_string().contains("portal"));
    }

    #[test]
    fn arterial_is_preselected() {
        assert_eq!(Phase::default(), Phase::Arterial);
    }
}
