use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::bands::ChannelTable;
use crate::spectrum::Detection;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChannelLabel {
    /// Peak sits on a channel's nominal center.
    Exact { name: String },
    /// Every channel whose range contains the peak.
    Potential { candidates: Vec<String> },
    Unclear,
}

impl ChannelLabel {
    pub fn exact_name(&self) -> Option<&str> {
        match self {
            ChannelLabel::Exact { name } => Some(name),
            _ => None,
        }
    }
}

/// Two tier lookup: an exact center hit is trusted, range containment only
/// yields candidates since the numbering schemes overlap heavily.
#[derive(Debug, Clone, Default)]
pub struct ChannelClassifier {
    table: ChannelTable,
}

impl ChannelClassifier {
    pub fn classify(&self, detection: &Detection) -> ChannelLabel {
        self.classify_frequency(detection.peak_mhz)
    }

    pub fn classify_frequency(&self, peak_mhz: f64) -> ChannelLabel {
        // Whole MHz part only: 5780.7 is still F3.
        let whole = peak_mhz.trunc();
        if let Some(band) = self
            .table
            .bands()
            .iter()
            .find(|b| f64::from(b.center_mhz) == whole)
        {
            return ChannelLabel::Exact { name: band.name() };
        }

        let candidates: Vec<String> = self
            .table
            .bands()
            .iter()
            .filter(|b| b.contains(peak_mhz))
            .map(|b| b.name())
            .collect();
        if candidates.is_empty() {
            ChannelLabel::Unclear
        } else {
            ChannelLabel::Potential { candidates }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detection(peak_mhz: f64) -> Detection {
        Detection {
            start_mhz: peak_mhz - 1.0,
            end_mhz: peak_mhz + 1.0,
            peak_mhz,
            peak_power_db: -20.0,
            position: None,
        }
    }

    #[test]
    fn exact_center_wins_without_candidates() {
        let classifier = ChannelClassifier::default();
        assert_eq!(
            classifier.classify(&detection(5865.0)),
            ChannelLabel::Exact {
                name: "A1".to_string()
            }
        );
        assert_eq!(
            classifier.classify(&detection(5783.6)).exact_name(),
            None,
            "5783 is no center"
        );
    }

    #[test]
    fn fractional_megahertz_is_dropped() {
        let classifier = ChannelClassifier::default();
        assert_eq!(classifier.classify_frequency(5780.7).exact_name(), Some("F3"));
        assert_eq!(classifier.classify_frequency(5865.4).exact_name(), Some("A1"));
        assert_eq!(classifier.classify_frequency(5864.6).exact_name(), None);
    }

    #[test]
    fn shared_center_goes_to_first_family() {
        // B1 and H3 are both 5733 MHz.
        let classifier = ChannelClassifier::default();
        assert_eq!(classifier.classify_frequency(5733.0).exact_name(), Some("B1"));
    }

    #[test]
    fn off_center_peak_lists_every_containing_band() {
        let classifier = ChannelClassifier::default();
        match classifier.classify_frequency(5300.2) {
            ChannelLabel::Potential { candidates } => assert_eq!(candidates, vec!["U1"]),
            other => panic!("unexpected label {:?}", other),
        }
        match classifier.classify_frequency(5783.6) {
            ChannelLabel::Potential { candidates } => {
                assert!(candidates.contains(&"A5".to_string()));
                assert!(candidates.contains(&"B3".to_string()));
                assert!(candidates.contains(&"F3".to_string()));
                assert!(candidates.contains(&"H4".to_string()));
            }
            other => panic!("unexpected label {:?}", other),
        }
    }

    #[test]
    fn out_of_table_is_unclear() {
        let classifier = ChannelClassifier::default();
        assert_eq!(classifier.classify_frequency(2440.0), ChannelLabel::Unclear);
        assert_eq!(classifier.classify_frequency(6100.0), ChannelLabel::Unclear);
    }
}
