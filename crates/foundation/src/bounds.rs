use serde::{Deserialize, Serialize};

/// Axis-aligned map extent `[min_x, min_y, max_x, max_y]`.
///
/// Serialized as a plain 4-element array, the way map views exchange it.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct Extent {
    pub min: [f64; 2],
    pub max: [f64; 2],
}

impl Extent {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Extent {
            min: [min_x, min_y],
            max: [max_x, max_y],
        }
    }

    pub fn to_array(self) -> [f64; 4] {
        [self.min[0], self.min[1], self.max[0], self.max[1]]
    }

    /// Comma-joined form used in query strings, e.g. `0,0,1,1`.
    pub fn to_param(self) -> String {
        self.to_array()
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl From<[f64; 4]> for Extent {
    fn from(v: [f64; 4]) -> Self {
        Extent::new(v[0], v[1], v[2], v[3])
    }
}

impl From<Extent> for [f64; 4] {
    fn from(e: Extent) -> Self {
        e.to_array()
    }
}

#[cfg(test)]
mod tests {
    use super::Extent;

    #[test]
    fn param_form_drops_trailing_zero_fraction() {
        assert_eq!(Extent::new(0.0, 0.0, 1.0, 1.0).to_param(), "0,0,1,1");
        assert_eq!(Extent::new(-1.5, 2.25, 3.0, 4.0).to_param(), "-1.5,2.25,3,4");
    }

    #[test]
    fn serializes_as_array() {
        let e = Extent::new(1.0, 2.0, 3.0, 4.0);
        assert_eq!(serde_json::to_string(&e).unwrap(), "[1.0,2.0,3.0,4.0]");
        let back: Extent = serde_json::from_str("[1,2,3,4]").unwrap();
        assert_eq!(back, e);
    }
}
