//! The Byzantine fault profile and its on-disk `byzantine.config` format.

use std::time::Duration;

use crate::error::{RcTypesError, RcTypesResult};

/// Which field a Type3 "alter" fault mutates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alteration {
    /// Remove one uniformly random element from `neighbourhood`.
    Neighbourhood,
    /// Remove one uniformly random element from `path`.
    Path,
    /// Swap two distinct random positions in `path`.
    Swap,
    /// Drop the last character of `id`.
    MsgId,
}

impl Alteration {
    fn parse(value: &str) -> RcTypesResult<Self> {
        match value {
            "neighbourhood" => Ok(Alteration::Neighbourhood),
            "path" => Ok(Alteration::Path),
            "swap" => Ok(Alteration::Swap),
            "msgid" => Ok(Alteration::MsgId),
            other => Err(RcTypesError::InvalidConfigValue {
                key: "Alterations".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for Alteration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Alteration::Neighbourhood => "neighbourhood",
            Alteration::Path => "path",
            Alteration::Swap => "swap",
            Alteration::MsgId => "msgid",
        };
        write!(f, "{s}")
    }
}

/// A node's configured Byzantine behavior. Three fault types compose in the
/// fixed order Type1 (delay) -> Type2 (drop) -> Type3 (alter).
#[derive(Debug, Clone, Default)]
pub struct Byzantine {
    pub type1: bool,
    pub type2: bool,
    pub type3: bool,
    pub delay: Duration,
    pub drop_rate: f64,
    pub alterations: Option<Alteration>,
}

impl Byzantine {
    /// A profile with every fault type off -- a no-op injector.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// True when every fault type is off (the all-flags-off boundary case).
    pub fn is_noop(&self) -> bool {
        !self.type1 && !self.type2 && !self.type3
    }

    /// Parses the `KEY=VALUE` / `#`-comment format documented in the
    /// external interfaces. Also accepts `MAX_BYZANTINES`, returned
    /// separately since it configures `f` rather than the fault profile
    /// itself.
    pub fn load(contents: &str) -> RcTypesResult<(Self, Option<usize>)> {
        let mut bz = Byzantine::default();
        let mut max_byzantines = None;

        for raw_line in contents.lines() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                return Err(RcTypesError::InvalidConfigLine(raw_line.to_string()));
            };
            let key = key.trim();
            let value = value.trim();

            match key {
                "MAX_BYZANTINES" => {
                    max_byzantines = Some(value.parse::<usize>().map_err(|_| {
                        RcTypesError::InvalidConfigValue {
                            key: key.to_string(),
                            value: value.to_string(),
                        }
                    })?);
                }
                "Type1" => bz.type1 = parse_bool(key, value)?,
                "Type2" => bz.type2 = parse_bool(key, value)?,
                "Type3" => bz.type3 = parse_bool(key, value)?,
                "Delay" => {
                    let millis = value.parse::<u64>().map_err(|_| RcTypesError::InvalidConfigValue {
                        key: key.to_string(),
                        value: value.to_string(),
                    })?;
                    bz.delay = Duration::from_millis(millis);
                }
                "DropRate" => {
                    bz.drop_rate = value.parse::<f64>().map_err(|_| RcTypesError::InvalidConfigValue {
                        key: key.to_string(),
                        value: value.to_string(),
                    })?;
                }
                "Alterations" => bz.alterations = Some(Alteration::parse(value)?),
                other => return Err(RcTypesError::UnknownConfigKey(other.to_string())),
            }
        }

        Ok((bz, max_byzantines))
    }
}

fn parse_bool(key: &str, value: &str) -> RcTypesResult<bool> {
    value.parse::<bool>().map_err(|_| RcTypesError::InvalidConfigValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_profile_is_noop() {
        assert!(Byzantine::disabled().is_noop());
    }

    #[test]
    fn load_round_trips_the_documented_example() {
        let config = "\
# comment line
Type1=true
Delay=250
DropRate=0.3
Alterations=path
";
        let (bz, max) = Byzantine::load(config).unwrap();
        assert!(bz.type1);
        assert!(!bz.type2);
        assert_eq!(bz.delay, Duration::from_millis(250));
        assert_eq!(bz.drop_rate, 0.3);
        assert_eq!(bz.alterations, Some(Alteration::Path));
        assert_eq!(max, None);
    }

    #[test]
    fn load_parses_max_byzantines() {
        let (_, max) = Byzantine::load("MAX_BYZANTINES=2\n").unwrap();
        assert_eq!(max, Some(2));
    }

    #[test]
    fn load_rejects_malformed_line() {
        assert!(Byzantine::load("not-a-kv-pair\n").is_err());
    }

    #[test]
    fn load_rejects_unknown_key() {
        assert!(Byzantine::load("Bogus=1\n").is_err());
    }

    #[test]
    fn load_ignores_blank_lines_and_comments() {
        let (bz, _) = Byzantine::load("\n# just a comment\n\nType2=true\n").unwrap();
        assert!(bz.type2);
    }
}
