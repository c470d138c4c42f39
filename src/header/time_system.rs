use hifitime::TimeScale;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Time system of the observation timestamps,
/// as declared in the `TIME OF FIRST OBS` header field.
#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TimeSystem {
    /// GPS time
    GPS,
    /// Glonass time (UTC based)
    GLO,
    /// Galileo System Time
    GAL,
    /// BeiDou Time
    BDT,
    /// QZSS time
    QZS,
    /// IRNSS time
    IRN,
    /// Any other label
    Custom(String),
}

impl Default for TimeSystem {
    fn default() -> Self {
        Self::GPS
    }
}

impl std::str::FromStr for TimeSystem {
    type Err = std::convert::Infallible;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq("GPS") {
            Ok(Self::GPS)
        } else if s.eq("GLO") {
            Ok(Self::GLO)
        } else if s.eq("GAL") {
            Ok(Self::GAL)
        } else if s.eq("BDT") {
            Ok(Self::BDT)
        } else if s.eq("QZS") {
            Ok(Self::QZS)
        } else if s.eq("IRN") {
            Ok(Self::IRN)
        } else {
            Ok(Self::Custom(s.to_string()))
        }
    }
}

impl From<TimeSystem> for TimeScale {
    fn from(ts: TimeSystem) -> Self {
        match ts {
            TimeSystem::GPS => Self::GPST,
            TimeSystem::GLO => Self::UTC,
            TimeSystem::GAL => Self::GST,
            TimeSystem::BDT => Self::BDT,
            TimeSystem::QZS => Self::QZSST,
            // IRNSS time is steered to GPST
            TimeSystem::IRN => Self::GPST,
            TimeSystem::Custom(_) => Self::GPST, /* incorrect usage */
        }
    }
}

impl std::fmt::Display for TimeSystem {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::GPS => fmt.write_str("GPS"),
            Self::GLO => fmt.write_str("GLO"),
            Self::GAL => fmt.write_str("GAL"),
            Self::BDT => fmt.write_str("BDT"),
            Self::QZS => fmt.write_str("QZS"),
            Self::IRN => fmt.write_str("IRN"),
            Self::Custom(s) => fmt.write_str(s),
        }
    }
}

#[cfg(test)]
mod test {
    use super::TimeSystem;
    use hifitime::TimeScale;
    use std::str::FromStr;
    #[test]
    fn from_str() {
        assert_eq!(TimeSystem::default(), TimeSystem::GPS);
        assert_eq!(TimeSystem::from_str("").unwrap(), TimeSystem::GPS);
        assert_eq!(TimeSystem::from_str("GAL").unwrap(), TimeSystem::GAL);
        assert_eq!(TimeSystem::from_str(" BDT ").unwrap(), TimeSystem::BDT);
        assert_eq!(
            TimeSystem::from_str("LAB").unwrap(),
            TimeSystem::Custom(String::from("LAB"))
        );
        assert_eq!(TimeScale::from(TimeSystem::GAL), TimeScale::GST);
        assert_eq!(TimeScale::from(TimeSystem::GLO), TimeScale::UTC);
    }
}
