use crate::characteristics::{AirQuality, FilterChangeIndication};
use crate::error::{BridgeError, Result};

/// Buckets a numeric reading into a label by lower bound.
///
/// Bounds are stored ascending; lookup scans them from the highest down and
/// the first bound not exceeding the reading wins.
#[derive(Debug, Clone)]
pub struct ThresholdTable<L> {
    buckets: Vec<(f64, L)>,
}

impl<L: Copy> ThresholdTable<L> {
    pub fn new(buckets: Vec<(f64, L)>) -> Result<Self> {
        if buckets.is_empty() {
            return Err(BridgeError::Configuration(
                "threshold table is empty".to_string(),
            ));
        }
        if buckets.windows(2).any(|pair| pair[0].0 >= pair[1].0) {
            return Err(BridgeError::Configuration(
                "threshold bounds must strictly increase".to_string(),
            ));
        }
        Ok(ThresholdTable { buckets })
    }

    /// `None` when the reading is below the lowest bound (or NaN).
    pub fn classify(&self, reading: f64) -> Option<L> {
        self.buckets
            .iter()
            .rev()
            .find(|(bound, _)| reading >= *bound)
            .map(|(_, label)| *label)
    }
}

const AIR_QUALITY_LEVELS: [(f64, AirQuality); 5] = [
    (0.0, AirQuality::Excellent),
    (50.0, AirQuality::Good),
    (100.0, AirQuality::Fair),
    (150.0, AirQuality::Inferior),
    (200.0, AirQuality::Poor),
];

/// Remaining filter life below 5% asks for a replacement.
const FILTER_LIFE_LEVELS: [(f64, FilterChangeIndication); 2] = [
    (f64::NEG_INFINITY, FilterChangeIndication::ChangeFilter),
    (5.0, FilterChangeIndication::FilterOk),
];

pub fn air_quality_levels() -> ThresholdTable<AirQuality> {
    ThresholdTable::new(AIR_QUALITY_LEVELS.to_vec()).expect("air quality bounds ascend")
}

pub fn filter_life_levels() -> ThresholdTable<FilterChangeIndication> {
    ThresholdTable::new(FILTER_LIFE_LEVELS.to_vec()).expect("filter life bounds ascend")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_air_quality_buckets() {
        let table = air_quality_levels();
        assert_eq!(table.classify(0.0), Some(AirQuality::Excellent));
        assert_eq!(table.classify(49.0), Some(AirQuality::Excellent));
        assert_eq!(table.classify(50.0), Some(AirQuality::Good));
        assert_eq!(table.classify(99.5), Some(AirQuality::Good));
        assert_eq!(table.classify(150.0), Some(AirQuality::Inferior));
        assert_eq!(table.classify(200.0), Some(AirQuality::Poor));
        assert_eq!(table.classify(201.0), Some(AirQuality::Poor));
        assert_eq!(table.classify(-1.0), None);
        assert_eq!(table.classify(f64::NAN), None);
    }

    #[test]
    fn test_filter_boundary() {
        let table = filter_life_levels();
        assert_eq!(table.classify(4.0), Some(FilterChangeIndication::ChangeFilter));
        assert_eq!(table.classify(4.9), Some(FilterChangeIndication::ChangeFilter));
        assert_eq!(table.classify(5.0), Some(FilterChangeIndication::FilterOk));
        assert_eq!(table.classify(-3.0), Some(FilterChangeIndication::ChangeFilter));
    }

    #[test]
    fn test_named_tables_are_valid() {
        assert!(ThresholdTable::new(AIR_QUALITY_LEVELS.to_vec()).is_ok());
        assert!(ThresholdTable::new(FILTER_LIFE_LEVELS.to_vec()).is_ok());
    }

    #[test]
    fn test_new_validates_bounds() {
        assert!(ThresholdTable::<u8>::new(vec![]).is_err());
        assert!(ThresholdTable::new(vec![(10.0, 1u8), (10.0, 2u8)]).is_err());
        let table = ThresholdTable::new(vec![(0.0, 'a'), (10.0, 'b')]).unwrap();
        assert_eq!(table.classify(9.9), Some('a'));
        assert_eq!(table.classify(10.0), Some('b'));
    }
}
