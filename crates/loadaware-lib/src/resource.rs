//! Resource names, quantities and normalized resource lists
//!
//! Quantities arrive in the Kubernetes quantity grammar (`500m`, `2Gi`,
//! `1.5`, `1e3`). They are normalized exactly once, when a [`ResourceList`]
//! is built: CPU is kept in thousandths of a core, every other resource in
//! its natural unit. All arithmetic after ingestion works on those integers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Resource kinds understood by the load-aware evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceName {
    #[serde(rename = "cpu")]
    Cpu,
    #[serde(rename = "memory")]
    Memory,
    #[serde(rename = "ephemeral-storage")]
    EphemeralStorage,
    #[serde(rename = "pods")]
    Pods,
    #[serde(rename = "nvidia.com/gpu")]
    Gpu,
}

impl ResourceName {
    pub const ALL: [ResourceName; 5] = [
        ResourceName::Cpu,
        ResourceName::Memory,
        ResourceName::EphemeralStorage,
        ResourceName::Pods,
        ResourceName::Gpu,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceName::Cpu => "cpu",
            ResourceName::Memory => "memory",
            ResourceName::EphemeralStorage => "ephemeral-storage",
            ResourceName::Pods => "pods",
            ResourceName::Gpu => "nvidia.com/gpu",
        }
    }
}

impl fmt::Display for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceName {
    type Err = QuantityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| QuantityError::UnknownResource(s.to_string()))
    }
}

/// Errors raised while reading quantities
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuantityError {
    #[error("empty quantity")]
    Empty,

    #[error("invalid quantity {0:?}")]
    Invalid(String),

    #[error("unknown quantity suffix {suffix:?} in {input:?}")]
    UnknownSuffix { input: String, suffix: String },

    #[error("quantity {0:?} is out of range")]
    OutOfRange(String),

    #[error("unknown resource name {0:?}")]
    UnknownResource(String),
}

/// A parsed quantity, stored in thousandths of its base unit
///
/// Values that are not a whole number of milli-units are rounded up, the
/// same way Kubernetes rounds when asked for a milli value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Quantity {
    milli: i64,
}

impl Quantity {
    pub const ZERO: Quantity = Quantity { milli: 0 };

    pub fn from_milli(milli: i64) -> Self {
        Self { milli }
    }

    pub fn from_value(value: i64) -> Self {
        Self {
            milli: value.saturating_mul(1000),
        }
    }

    pub fn milli_value(&self) -> i64 {
        self.milli
    }

    /// Whole units, rounded up
    pub fn value(&self) -> i64 {
        let whole = self.milli.div_euclid(1000);
        if self.milli.rem_euclid(1000) == 0 {
            whole
        } else {
            whole + 1
        }
    }

    pub fn is_zero(&self) -> bool {
        self.milli == 0
    }

    /// Comparable integer for this resource kind
    pub fn scaled(&self, resource: ResourceName) -> i64 {
        get_resource_value(resource, self)
    }
}

/// Convert a quantity to the integer scale used for `resource`:
/// milli-cores for CPU, natural units for everything else.
pub fn get_resource_value(resource: ResourceName, quantity: &Quantity) -> i64 {
    match resource {
        ResourceName::Cpu => quantity.milli_value(),
        _ => quantity.value(),
    }
}

impl FromStr for Quantity {
    type Err = QuantityError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let s = input.trim();
        if s.is_empty() {
            return Err(QuantityError::Empty);
        }

        let (negative, rest) = match s.as_bytes()[0] {
            b'-' => (true, &s[1..]),
            b'+' => (false, &s[1..]),
            _ => (false, s),
        };

        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let (number, suffix) = rest.split_at(number_len);
        if number.is_empty() || number == "." || number.matches('.').count() > 1 {
            return Err(QuantityError::Invalid(input.to_string()));
        }

        let (int_part, frac_part) = number.split_once('.').unwrap_or((number, ""));
        let digits = format!("{int_part}{frac_part}");
        let mantissa: i128 = digits
            .parse()
            .map_err(|_| QuantityError::OutOfRange(input.to_string()))?;

        let (binary_multiplier, decimal_exponent) = parse_suffix(input, suffix)?;

        // milli = mantissa * binary * 10^(3 + exponent - frac_digits)
        let scale = 3 + decimal_exponent - frac_part.len() as i32;
        let out_of_range = || QuantityError::OutOfRange(input.to_string());
        let base = mantissa.checked_mul(binary_multiplier).ok_or_else(out_of_range)?;
        let milli = if scale >= 0 {
            10i128
                .checked_pow(scale as u32)
                .and_then(|factor| base.checked_mul(factor))
                .ok_or_else(out_of_range)?
        } else {
            match 10i128.checked_pow(scale.unsigned_abs()) {
                Some(divisor) => (base + divisor - 1) / divisor,
                // finer than any representable milli-unit
                None => i128::from(base > 0),
            }
        };

        let milli = if negative { -milli } else { milli };
        let milli = i64::try_from(milli).map_err(|_| out_of_range())?;
        Ok(Quantity { milli })
    }
}

/// Returns `(binary multiplier, decimal exponent)` for a quantity suffix
fn parse_suffix(input: &str, suffix: &str) -> Result<(i128, i32), QuantityError> {
    let binary = |power: u32| Ok((1024i128.pow(power), 0));
    let decimal = |exponent: i32| Ok((1, exponent));
    match suffix {
        "" => decimal(0),
        "m" => decimal(-3),
        "k" => decimal(3),
        "M" => decimal(6),
        "G" => decimal(9),
        "T" => decimal(12),
        "P" => decimal(15),
        "E" => decimal(18),
        "Ki" => binary(1),
        "Mi" => binary(2),
        "Gi" => binary(3),
        "Ti" => binary(4),
        "Pi" => binary(5),
        "Ei" => binary(6),
        other => {
            let exponent = other
                .strip_prefix('e')
                .or_else(|| other.strip_prefix('E'))
                .and_then(|exp| exp.parse::<i32>().ok())
                .filter(|exp| exp.abs() <= 30);
            match exponent {
                Some(exp) => decimal(exp),
                None => Err(QuantityError::UnknownSuffix {
                    input: input.to_string(),
                    suffix: other.to_string(),
                }),
            }
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.milli % 1000 == 0 {
            write!(f, "{}", self.milli / 1000)
        } else {
            write!(f, "{}m", self.milli)
        }
    }
}

/// A quantity as written in JSON: a string or a plain number
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawQuantity {
    Text(String),
    Integer(i64),
    Float(f64),
}

impl RawQuantity {
    pub fn parse(self) -> Result<Quantity, QuantityError> {
        match self {
            RawQuantity::Text(text) => text.parse(),
            RawQuantity::Integer(value) => Ok(Quantity::from_value(value)),
            RawQuantity::Float(value) => value.to_string().parse(),
        }
    }
}

/// Per-resource amounts, already normalized with [`get_resource_value`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, RawQuantity>",
    into = "BTreeMap<String, String>"
)]
pub struct ResourceList(BTreeMap<ResourceName, i64>);

impl ResourceList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a list from quantities, normalizing each for its resource
    pub fn from_quantities<I>(quantities: I) -> Self
    where
        I: IntoIterator<Item = (ResourceName, Quantity)>,
    {
        quantities
            .into_iter()
            .map(|(name, quantity)| (name, quantity.scaled(name)))
            .collect()
    }

    pub fn get(&self, name: ResourceName) -> Option<i64> {
        self.0.get(&name).copied()
    }

    /// Value for `name`, zero when missing
    pub fn value(&self, name: ResourceName) -> i64 {
        self.get(name).unwrap_or(0)
    }

    pub fn insert(&mut self, name: ResourceName, value: i64) {
        self.0.insert(name, value);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ResourceName, i64)> + '_ {
        self.0.iter().map(|(name, value)| (*name, *value))
    }

    pub fn add_value(&mut self, name: ResourceName, value: i64) {
        let entry = self.0.entry(name).or_insert(0);
        *entry = entry.saturating_add(value);
    }

    /// Per-resource addition; resources only in `other` are inserted
    pub fn add(&mut self, other: &ResourceList) {
        for (name, value) in other.iter() {
            self.add_value(name, value);
        }
    }

    /// Per-resource subtraction floored at zero; resources missing here stay missing
    pub fn saturating_sub(&self, other: &ResourceList) -> ResourceList {
        self.iter()
            .map(|(name, value)| (name, (value - other.value(name)).max(0)))
            .collect()
    }
}

impl FromIterator<(ResourceName, i64)> for ResourceList {
    fn from_iter<T: IntoIterator<Item = (ResourceName, i64)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl TryFrom<BTreeMap<String, RawQuantity>> for ResourceList {
    type Error = QuantityError;

    fn try_from(raw: BTreeMap<String, RawQuantity>) -> Result<Self, Self::Error> {
        let mut list = ResourceList::new();
        for (name, quantity) in raw {
            let Ok(resource) = name.parse::<ResourceName>() else {
                tracing::debug!(resource = %name, "Ignoring unsupported resource");
                continue;
            };
            let quantity = quantity.parse()?;
            list.insert(resource, quantity.scaled(resource));
        }
        Ok(list)
    }
}

impl From<ResourceList> for BTreeMap<String, String> {
    fn from(list: ResourceList) -> Self {
        list.iter()
            .map(|(name, value)| {
                let text = match name {
                    ResourceName::Cpu => Quantity::from_milli(value).to_string(),
                    _ => value.to_string(),
                };
                (name.as_str().to_string(), text)
            })
            .collect()
    }
}
