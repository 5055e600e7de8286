// Notation converter parameters
// Time-signature map, key-signature map and quantization grid in the converter's argument syntax

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{NotationError, NotationResult};

/// `measure=numerator/denominator`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSignatureEntry {
    pub measure: u32,
    pub numerator: u8,
    pub denominator: u8,
}

impl fmt::Display for TimeSignatureEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}/{}", self.measure, self.numerator, self.denominator)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyMode {
    Major,
    Minor,
}

impl KeyMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyMode::Major => "major",
            KeyMode::Minor => "minor",
        }
    }
}

impl FromStr for KeyMode {
    type Err = NotationError;

    fn from_str(s: &str) -> NotationResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "major" => Ok(KeyMode::Major),
            "minor" => Ok(KeyMode::Minor),
            other => Err(NotationError::InvalidParameter(format!(
                "unknown key mode '{}'",
                other
            ))),
        }
    }
}

/// `measure=pitch[,mode]`, pitch in LilyPond note names (`c`, `fis`, `bes`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySignatureEntry {
    pub measure: u32,
    pub tonic: String,
    pub mode: Option<KeyMode>,
}

impl fmt::Display for KeySignatureEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.measure, self.tonic)?;
        if let Some(mode) = self.mode {
            write!(f, ",{}", mode.as_str())?;
        }
        Ok(())
    }
}

/// Ordered time-signature changes, e.g. `1=4/4,17=3/4`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeSignatureMap(pub Vec<TimeSignatureEntry>);

/// Ordered key-signature changes, e.g. `1=c 9=a,minor`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KeySignatureMap(pub Vec<KeySignatureEntry>);

/// Shortest note value the converter snaps to (16 = sixteenth notes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Quantization(u32);

impl Quantization {
    pub fn new(denominator: u32) -> NotationResult<Self> {
        if denominator == 0 || !denominator.is_power_of_two() {
            return Err(NotationError::InvalidParameter(format!(
                "quantization must be a positive power of two, got {}",
                denominator
            )));
        }
        Ok(Quantization(denominator))
    }

    pub fn denominator(&self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for Quantization {
    type Error = NotationError;

    fn try_from(value: u32) -> NotationResult<Self> {
        Quantization::new(value)
    }
}

impl From<Quantization> for u32 {
    fn from(quant: Quantization) -> u32 {
        quant.0
    }
}

impl fmt::Display for Quantization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Split a map into tokens; commas and whitespace both separate
fn tokens(s: &str) -> impl Iterator<Item = &str> {
    s.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
}

fn parse_measure(raw: &str, entry: &str) -> NotationResult<u32> {
    match raw.trim().parse::<u32>() {
        Ok(measure) if measure >= 1 => Ok(measure),
        _ => Err(NotationError::InvalidParameter(format!(
            "invalid measure number in '{}'",
            entry
        ))),
    }
}

fn check_ascending(measures: impl Iterator<Item = u32>) -> NotationResult<()> {
    let mut last = 0;
    for measure in measures {
        if measure <= last {
            return Err(NotationError::InvalidParameter(format!(
                "measure {} is not after measure {}",
                measure, last
            )));
        }
        last = measure;
    }
    Ok(())
}

fn is_note_name(tonic: &str) -> bool {
    let mut chars = tonic.chars();
    matches!(chars.next(), Some('a'..='g')) && chars.all(|c| c.is_ascii_lowercase())
}

impl FromStr for TimeSignatureMap {
    type Err = NotationError;

    fn from_str(s: &str) -> NotationResult<Self> {
        let mut entries = Vec::new();

        for token in tokens(s) {
            let invalid = || NotationError::InvalidParameter(format!("invalid time signature '{}'", token));

            let (measure, signature) = token.split_once('=').ok_or_else(invalid)?;
            let (numerator, denominator) = signature.split_once('/').ok_or_else(invalid)?;
            let numerator: u8 = numerator.parse().map_err(|_| invalid())?;
            let denominator: u8 = denominator.parse().map_err(|_| invalid())?;

            if numerator == 0 || denominator == 0 || !denominator.is_power_of_two() {
                return Err(invalid());
            }

            entries.push(TimeSignatureEntry {
                measure: parse_measure(measure, token)?,
                numerator,
                denominator,
            });
        }

        check_ascending(entries.iter().map(|e| e.measure))?;
        Ok(TimeSignatureMap(entries))
    }
}

impl FromStr for KeySignatureMap {
    type Err = NotationError;

    fn from_str(s: &str) -> NotationResult<Self> {
        let mut entries: Vec<KeySignatureEntry> = Vec::new();

        for token in tokens(s) {
            match token.split_once('=') {
                Some((measure, tonic)) => {
                    let tonic = tonic.to_ascii_lowercase();
                    if !is_note_name(&tonic) {
                        return Err(NotationError::InvalidParameter(format!(
                            "invalid key tonic in '{}'",
                            token
                        )));
                    }
                    entries.push(KeySignatureEntry {
                        measure: parse_measure(measure, token)?,
                        tonic,
                        mode: None,
                    });
                }
                // A bare word is the mode of the entry before it
                None => match entries.last_mut() {
                    Some(entry) if entry.mode.is_none() => entry.mode = Some(token.parse()?),
                    _ => {
                        return Err(NotationError::InvalidParameter(format!(
                            "key mode '{}' does not follow a key",
                            token
                        )))
                    }
                },
            }
        }

        check_ascending(entries.iter().map(|e| e.measure))?;
        Ok(KeySignatureMap(entries))
    }
}

fn join<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T], sep: &str) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for TimeSignatureMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        join(f, &self.0, ",")
    }
}

impl fmt::Display for KeySignatureMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Entries carry their own comma before the mode, so space-separate them
        join(f, &self.0, " ")
    }
}

impl TryFrom<String> for TimeSignatureMap {
    type Error = NotationError;

    fn try_from(value: String) -> NotationResult<Self> {
        value.parse()
    }
}

impl From<TimeSignatureMap> for String {
    fn from(map: TimeSignatureMap) -> String {
        map.to_string()
    }
}

impl TryFrom<String> for KeySignatureMap {
    type Error = NotationError;

    fn try_from(value: String) -> NotationResult<Self> {
        value.parse()
    }
}

impl From<KeySignatureMap> for String {
    fn from(map: KeySignatureMap) -> String {
        map.to_string()
    }
}

/// Everything the notation converter needs besides the MIDI file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterParams {
    pub time_signatures: TimeSignatureMap,
    pub key_signatures: KeySignatureMap,
    pub quantization: Quantization,
}

impl Default for ConverterParams {
    fn default() -> Self {
        ConverterParams {
            time_signatures: TimeSignatureMap(vec![TimeSignatureEntry {
                measure: 1,
                numerator: 4,
                denominator: 4,
            }]),
            key_signatures: KeySignatureMap(vec![KeySignatureEntry {
                measure: 1,
                tonic: "c".to_string(),
                mode: None,
            }]),
            quantization: Quantization(16),
        }
    }
}

impl ConverterParams {
    /// Parse all three parameters from their textual forms
    pub fn parse(time: &str, key: &str, quant: u32) -> NotationResult<Self> {
        Ok(ConverterParams {
            time_signatures: time.parse()?,
            key_signatures: key.parse()?,
            quantization: Quantization::new(quant)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_time_map() {
        let map: TimeSignatureMap = "1=4/4, 17=3/4".parse().unwrap();

        assert_eq!(map.0.len(), 2);
        assert_eq!(
            map.0[1],
            TimeSignatureEntry {
                measure: 17,
                numerator: 3,
                denominator: 4
            }
        );
        assert_eq!(map.to_string(), "1=4/4,17=3/4");
    }

    #[test]
    fn test_time_map_rejects_bad_entries() {
        assert!("1=4/3".parse::<TimeSignatureMap>().is_err());
        assert!("0=4/4".parse::<TimeSignatureMap>().is_err());
        assert!("1=4".parse::<TimeSignatureMap>().is_err());
        assert!("4/4".parse::<TimeSignatureMap>().is_err());
        assert!("5=4/4,2=3/4".parse::<TimeSignatureMap>().is_err());
    }

    #[test]
    fn test_parse_key_map_with_modes() {
        let map: KeySignatureMap = "1=c,9=a,minor 17=Bes".parse().unwrap();

        assert_eq!(map.0.len(), 3);
        assert_eq!(map.0[0].mode, None);
        assert_eq!(map.0[1].mode, Some(KeyMode::Minor));
        assert_eq!(map.0[2].tonic, "bes");
        assert_eq!(map.to_string(), "1=c 9=a,minor 17=bes");
    }

    #[test]
    fn test_key_map_rejects_bad_entries() {
        assert!("1=h".parse::<KeySignatureMap>().is_err());
        assert!("minor".parse::<KeySignatureMap>().is_err());
        assert!("1=a,minor,major".parse::<KeySignatureMap>().is_err());
        assert!("1=a,dorian".parse::<KeySignatureMap>().is_err());
    }

    #[test]
    fn test_quantization_power_of_two() {
        assert_eq!(Quantization::new(16).unwrap().denominator(), 16);
        assert!(Quantization::new(0).is_err());
        assert!(Quantization::new(12).is_err());
    }

    #[test]
    fn test_params_serde() {
        let json = r#"{"time_signatures":"1=6/8","key_signatures":"1=d,major","quantization":8}"#;
        let params: ConverterParams = serde_json::from_str(json).unwrap();

        assert_eq!(params.quantization.denominator(), 8);
        assert_eq!(params.key_signatures.0[0].mode, Some(KeyMode::Major));

        let bad = r#"{"time_signatures":"1=6/8","key_signatures":"1=d","quantization":6}"#;
        assert!(serde_json::from_str::<ConverterParams>(bad).is_err());
    }

    #[test]
    fn test_parse_all() {
        let params = ConverterParams::parse("1=4/4", "1=g", 32).unwrap();
        assert_eq!(params.time_signatures.to_string(), "1=4/4");
        assert_eq!(params.key_signatures.to_string(), "1=g");
        assert_eq!(params.quantization.to_string(), "32");
    }
}
