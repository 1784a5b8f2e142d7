use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identifies the property being animated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnimatableProperty {
    X,
    Y,
    Scale,
    Rotation,
    Opacity,
}

impl AnimatableProperty {
    pub const ALL: [AnimatableProperty; 5] = [
        AnimatableProperty::X,
        AnimatableProperty::Y,
        AnimatableProperty::Scale,
        AnimatableProperty::Rotation,
        AnimatableProperty::Opacity,
    ];

    /// The key this property is stored under in a layer's `keyframes` object.
    pub fn key(&self) -> &'static str {
        match self {
            AnimatableProperty::X => "x",
            AnimatableProperty::Y => "y",
            AnimatableProperty::Scale => "scale",
            AnimatableProperty::Rotation => "rotation",
            AnimatableProperty::Opacity => "opacity",
        }
    }
}

impl std::fmt::Display for AnimatableProperty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// A keyframe: a value at a specific time (seconds).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    pub time: f64,
    pub value: f64,
}

impl Keyframe {
    pub fn new(time: f64, value: f64) -> Self {
        Self { time, value }
    }

    /// Read a keyframe from its JSON form. Entries without both a numeric
    /// `time` and a numeric `value` yield `None`.
    pub fn from_json(entry: &Value) -> Option<Self> {
        let obj = entry.as_object()?;
        let time = obj.get("time")?.as_f64()?;
        let value = obj.get("value")?.as_f64()?;
        Some(Self { time, value })
    }
}

/// A piecewise-linear animation curve over sparse keyframes.
///
/// Keyframes are held sorted by time. Sorting is stable, so keyframes sharing
/// a time keep the order they were supplied in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Curve {
    keyframes: Vec<Keyframe>,
}

impl Curve {
    pub fn new(mut keyframes: Vec<Keyframe>) -> Self {
        keyframes.sort_by(|a, b| a.time.total_cmp(&b.time));
        Self { keyframes }
    }

    /// Build a curve from a JSON array, discarding malformed entries.
    /// Anything that is not an array produces an empty curve.
    pub fn from_json(value: &Value) -> Self {
        let keyframes = value
            .as_array()
            .map(|entries| entries.iter().filter_map(Keyframe::from_json).collect())
            .unwrap_or_default();
        Self::new(keyframes)
    }

    pub fn keyframes(&self) -> &[Keyframe] {
        &self.keyframes
    }

    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }

    /// Evaluate the curve at `time`, clamping to the first and last keyframe
    /// values outside their range. An empty curve yields `default`.
    pub fn evaluate(&self, time: f64, default: f64) -> f64 {
        let (first, last) = match (self.keyframes.first(), self.keyframes.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return default,
        };

        if time <= first.time {
            return first.value;
        }
        if time >= last.time {
            return last.value;
        }

        for pair in self.keyframes.windows(2) {
            let (k1, k2) = (&pair[0], &pair[1]);
            if k1.time <= time && time <= k2.time {
                let duration = k2.time - k1.time;
                let t = if duration > 0.0 {
                    (time - k1.time) / duration
                } else {
                    0.0
                };
                return k1.value + (k2.value - k1.value) * t;
            }
        }

        default
    }
}

/// The animation curves of one layer, one optional curve per animatable property.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurveSet {
    pub x: Option<Curve>,
    pub y: Option<Curve>,
    pub scale: Option<Curve>,
    pub rotation: Option<Curve>,
    pub opacity: Option<Curve>,
}

impl CurveSet {
    /// Read the known properties out of a layer's `keyframes` object.
    /// Other keys (editor-only tracks) are ignored.
    pub fn from_json(keyframes: &Map<String, Value>) -> Self {
        let mut set = CurveSet::default();
        for property in AnimatableProperty::ALL {
            if let Some(raw) = keyframes.get(property.key()) {
                set.set(property, Curve::from_json(raw));
            }
        }
        set
    }

    pub fn get(&self, property: AnimatableProperty) -> Option<&Curve> {
        match property {
            AnimatableProperty::X => self.x.as_ref(),
            AnimatableProperty::Y => self.y.as_ref(),
            AnimatableProperty::Scale => self.scale.as_ref(),
            AnimatableProperty::Rotation => self.rotation.as_ref(),
            AnimatableProperty::Opacity => self.opacity.as_ref(),
        }
    }

    pub fn set(&mut self, property: AnimatableProperty, curve: Curve) {
        let slot = match property {
            AnimatableProperty::X => &mut self.x,
            AnimatableProperty::Y => &mut self.y,
            AnimatableProperty::Scale => &mut self.scale,
            AnimatableProperty::Rotation => &mut self.rotation,
            AnimatableProperty::Opacity => &mut self.opacity,
        };
        *slot = Some(curve);
    }

    /// Evaluate one property, falling back to `default` when it has no curve.
    pub fn evaluate(&self, property: AnimatableProperty, time: f64, default: f64) -> f64 {
        match self.get(property) {
            Some(curve) => curve.evaluate(time, default),
            None => default,
        }
    }
}
