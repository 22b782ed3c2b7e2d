//! Custom rule data structures.
//!
//! A custom strategy has one buy `Rule` and one sell `Rule`. A rule is a
//! single-level fold (AND / OR) over a flat list of `Condition`s; rules do not
//! nest. The serde shape is the rule-builder JSON:
//! `{"operator": "AND", "conditions": [{"type": "priceThreshold", ...}]}`.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Combinator {
    #[serde(rename = "AND")]
    And,
    #[serde(rename = "OR")]
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Comparison {
    Lt,
    Gt,
    Eq,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaDirection {
    Above,
    Below,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Band {
    Upper,
    Lower,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CrossDirection {
    CrossAbove,
    CrossBelow,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Condition {
    PriceThreshold {
        operator: Comparison,
        value: f64,
    },
    MaCrossover {
        short_window: usize,
        long_window: usize,
        direction: MaDirection,
    },
    Rsi {
        period: usize,
        operator: Comparison,
        value: f64,
    },
    #[serde(rename = "bollingerBands")]
    BollingerBand {
        window: usize,
        num_std_dev: f64,
        band: Band,
        direction: CrossDirection,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub operator: Combinator,
    pub conditions: Vec<Condition>,
}

impl Rule {
    pub fn all(conditions: Vec<Condition>) -> Self {
        Rule {
            operator: Combinator::And,
            conditions,
        }
    }

    pub fn any(conditions: Vec<Condition>) -> Self {
        Rule {
            operator: Combinator::Or,
            conditions,
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Comparison::Lt => write!(f, "<"),
            Comparison::Gt => write!(f, ">"),
            Comparison::Eq => write!(f, "="),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::PriceThreshold { operator, value } => write!(f, "PRICE {} {}", operator, value),
            Condition::MaCrossover {
                short_window,
                long_window,
                direction,
            } => {
                let dir = match direction {
                    MaDirection::Above => "ABOVE",
                    MaDirection::Below => "BELOW",
                };
                write!(f, "MA_CROSS({}, {}, {})", short_window, long_window, dir)
            }
            Condition::Rsi {
                period,
                operator,
                value,
            } => write!(f, "RSI({}) {} {}", period, operator, value),
            Condition::BollingerBand {
                window,
                num_std_dev,
                band,
                direction,
            } => {
                let band = match band {
                    Band::Upper => "UPPER",
                    Band::Lower => "LOWER",
                };
                let dir = match direction {
                    CrossDirection::CrossAbove => "CROSS_ABOVE",
                    CrossDirection::CrossBelow => "CROSS_BELOW",
                };
                write!(f, "BOLLINGER({}, {}, {}, {})", window, num_std_dev, band, dir)
            }
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keyword = match self.operator {
            Combinator::And => "AND",
            Combinator::Or => "OR",
        };
        write!(f, "{}(", keyword)?;
        for (i, condition) in self.conditions.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", condition)?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn condition_display() {
        let c = Condition::PriceThreshold {
            operator: Comparison::Lt,
            value: 100.0,
        };
        assert_eq!(c.to_string(), "PRICE < 100");

        let c = Condition::Rsi {
            period: 14,
            operator: Comparison::Gt,
            value: 70.5,
        };
        assert_eq!(c.to_string(), "RSI(14) > 70.5");

        let c = Condition::MaCrossover {
            short_window: 5,
            long_window: 20,
            direction: MaDirection::Below,
        };
        assert_eq!(c.to_string(), "MA_CROSS(5, 20, BELOW)");

        let c = Condition::BollingerBand {
            window: 20,
            num_std_dev: 2.5,
            band: Band::Lower,
            direction: CrossDirection::CrossBelow,
        };
        assert_eq!(c.to_string(), "BOLLINGER(20, 2.5, LOWER, CROSS_BELOW)");
    }

    #[test]
    fn rule_display() {
        let rule = Rule::any(vec![
            Condition::PriceThreshold {
                operator: Comparison::Gt,
                value: 200.0,
            },
            Condition::Rsi {
                period: 14,
                operator: Comparison::Gt,
                value: 70.0,
            },
        ]);
        assert_eq!(rule.to_string(), "OR(PRICE > 200, RSI(14) > 70)");
    }

    #[test]
    fn deserializes_form_json() {
        let json = r#"{
            "operator": "AND",
            "conditions": [
                {"type": "priceThreshold", "operator": "lt", "value": 100},
                {"type": "maCrossover", "shortWindow": 5, "longWindow": 20, "direction": "above"},
                {"type": "rsi", "period": 14, "operator": "gt", "value": 30},
                {"type": "bollingerBands", "window": 20, "numStdDev": 2, "band": "lower", "direction": "crossBelow"}
            ]
        }"#;
        let rule: Rule = serde_json::from_str(json).unwrap();

        assert_eq!(rule.operator, Combinator::And);
        assert_eq!(rule.conditions.len(), 4);
        assert_eq!(
            rule.conditions[1],
            Condition::MaCrossover {
                short_window: 5,
                long_window: 20,
                direction: MaDirection::Above,
            }
        );
        assert_eq!(
            rule.conditions[3],
            Condition::BollingerBand {
                window: 20,
                num_std_dev: 2.0,
                band: Band::Lower,
                direction: CrossDirection::CrossBelow,
            }
        );
    }

    #[test]
    fn rejects_unknown_condition_type() {
        let json = r#"{"operator": "OR", "conditions": [{"type": "volumeSpike", "value": 3}]}"#;
        assert!(serde_json::from_str::<Rule>(json).is_err());
    }
}
