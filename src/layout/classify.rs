//! Region Classification
//!
//! Maps raw detector class ids to [`RegionType`]. The id table is shared
//! with the layout detection model and must stay in sync with its labels.

use super::types::RegionType;

/// Number of class ids the detector emits
pub const KNOWN_CLASS_COUNT: usize = 10;

/// Classifier for detector class ids
pub struct RegionClassifier;

impl RegionClassifier {
    /// Map a detector class id to its region type.
    ///
    /// Total over all integers; ids outside 0-9 are [`RegionType::Unknown`].
    pub fn classify(class_id: i64) -> RegionType {
        match class_id {
            0 => RegionType::Title,
            1 => RegionType::PlainText,
            2 => RegionType::AbandonedText,
            3 => RegionType::Figure,
            4 => RegionType::FigureCaption,
            5 => RegionType::Table,
            6 => RegionType::TableCaption,
            7 => RegionType::TableFootnote,
            8 => RegionType::IsolatedFormula,
            9 => RegionType::FormulaCaption,
            _ => RegionType::Unknown,
        }
    }

    /// Inverse of [`classify`](Self::classify) for known types
    pub fn class_id(region_type: RegionType) -> Option<i64> {
        RegionType::KNOWN
            .iter()
            .position(|t| *t == region_type)
            .map(|i| i as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_known_ids() {
        assert_eq!(RegionClassifier::classify(0), RegionType::Title);
        assert_eq!(RegionClassifier::classify(1), RegionType::PlainText);
        assert_eq!(RegionClassifier::classify(2), RegionType::AbandonedText);
        assert_eq!(RegionClassifier::classify(3), RegionType::Figure);
        assert_eq!(RegionClassifier::classify(4), RegionType::FigureCaption);
        assert_eq!(RegionClassifier::classify(5), RegionType::Table);
        assert_eq!(RegionClassifier::classify(6), RegionType::TableCaption);
        assert_eq!(RegionClassifier::classify(7), RegionType::TableFootnote);
        assert_eq!(RegionClassifier::classify(8), RegionType::IsolatedFormula);
        assert_eq!(RegionClassifier::classify(9), RegionType::FormulaCaption);
    }

    #[test]
    fn test_classify_unknown_ids() {
        for id in [-1, 10, 11, 255, i64::MAX, i64::MIN] {
            assert_eq!(RegionClassifier::classify(id), RegionType::Unknown);
        }
    }

    #[test]
    fn test_known_table_matches_classify() {
        assert_eq!(RegionType::KNOWN.len(), KNOWN_CLASS_COUNT);
        for (id, expected) in RegionType::KNOWN.iter().enumerate() {
            assert_eq!(RegionClassifier::classify(id as i64), *expected);
            assert_eq!(RegionClassifier::class_id(*expected), Some(id as i64));
        }
        assert_eq!(RegionClassifier::class_id(RegionType::Unknown), None);
    }
}
