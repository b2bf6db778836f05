use bevy::prelude::*;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// A scalar value drawn once per use.
///
/// Distributions are sampled with an explicitly passed generator so that
/// spawn and burst behavior is deterministic under a fixed seed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Reflect)]
pub enum ScalarDistribution {
    /// Always the same value.
    Constant(f32),
    /// A uniform draw in `[min, max)`.
    Uniform {
        min: f32,
        max: f32,
    },
}

impl Default for ScalarDistribution {
    fn default() -> Self {
        Self::Constant(0.0)
    }
}

impl ScalarDistribution {
    pub fn constant(value: f32) -> Self {
        Self::Constant(value)
    }

    pub fn uniform(min: f32, max: f32) -> Self {
        Self::Uniform { min, max }
    }

    pub fn sample<R: Rng>(&self, rng: &mut R) -> f32 {
        match *self {
            Self::Constant(value) => value,
            Self::Uniform { min, max } => {
                if max <= min {
                    min
                } else {
                    rng.gen_range(min..max)
                }
            }
        }
    }

    /// Upper bound of the distribution, used for peak-count estimates.
    pub fn max_value(&self) -> f32 {
        match *self {
            Self::Constant(value) => value,
            Self::Uniform { min, max } => max.max(min),
        }
    }

    pub fn mean(&self) -> f32 {
        match *self {
            Self::Constant(value) => value,
            Self::Uniform { min, max } => (min + max) * 0.5,
        }
    }
}

/// A per-component vector value drawn once per use.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Reflect)]
pub enum VectorDistribution {
    Constant(Vec3),
    /// Independent uniform draws per component in `[min, max)`.
    Uniform {
        min: Vec3,
        max: Vec3,
    },
}

impl Default for VectorDistribution {
    fn default() -> Self {
        Self::Constant(Vec3::ZERO)
    }
}

impl VectorDistribution {
    pub fn constant(value: Vec3) -> Self {
        Self::Constant(value)
    }

    pub fn uniform(min: Vec3, max: Vec3) -> Self {
        Self::Uniform { min, max }
    }

    pub fn sample<R: Rng>(&self, rng: &mut R) -> Vec3 {
        match *self {
            Self::Constant(value) => value,
            Self::Uniform { min, max } => Vec3::new(
                sample_component(rng, min.x, max.x),
                sample_component(rng, min.y, max.y),
                sample_component(rng, min.z, max.z),
            ),
        }
    }
}

fn sample_component<R: Rng>(rng: &mut R, min: f32, max: f32) -> f32 {
    if max <= min { min } else { rng.gen_range(min..max) }
}

/// One point of a [`Curve`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Reflect)]
pub struct CurvePoint {
    /// Normalized lifetime position in `[0, 1]`.
    pub time: f32,
    pub value: f32,
}

/// A piecewise-linear curve over normalized particle lifetime.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default, Reflect)]
pub struct Curve {
    /// Points ordered by time.
    pub points: Vec<CurvePoint>,
}

impl Curve {
    pub fn new(points: Vec<(f32, f32)>) -> Self {
        Self {
            points: points
                .into_iter()
                .map(|(time, value)| CurvePoint { time, value })
                .collect(),
        }
    }

    /// Samples the curve at `t`, clamping outside the covered range.
    /// An empty curve evaluates to `1.0`.
    pub fn sample(&self, t: f32) -> f32 {
        let Some(first) = self.points.first() else {
            return 1.0;
        };
        let t = t.clamp(0.0, 1.0);
        if t <= first.time {
            return first.value;
        }
        for pair in self.points.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if t <= b.time {
                let span = b.time - a.time;
                if span <= f32::EPSILON {
                    return b.value;
                }
                let local = (t - a.time) / span;
                return a.value + (b.value - a.value) * local;
            }
        }
        self.points[self.points.len() - 1].value
    }
}

/// How colors blend between adjacent [`GradientStop`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, Reflect)]
pub enum GradientInterpolation {
    #[default]
    Linear,
    /// Hold each stop's color until the next stop.
    Steps,
    Smoothstep,
}

/// One stop of a [`Gradient`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Reflect)]
pub struct GradientStop {
    /// Normalized position in `[0, 1]`.
    pub position: f32,
    /// RGBA color.
    pub color: [f32; 4],
}

/// A color gradient over normalized particle lifetime.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Reflect)]
pub struct Gradient {
    /// Stops ordered by position.
    pub stops: Vec<GradientStop>,
    #[serde(default)]
    pub interpolation: GradientInterpolation,
}

impl Default for Gradient {
    fn default() -> Self {
        Self::white()
    }
}

impl Gradient {
    /// A constant opaque-white gradient.
    pub fn white() -> Self {
        Self {
            stops: vec![
                GradientStop {
                    position: 0.0,
                    color: [1.0, 1.0, 1.0, 1.0],
                },
                GradientStop {
                    position: 1.0,
                    color: [1.0, 1.0, 1.0, 1.0],
                },
            ],
            interpolation: GradientInterpolation::Linear,
        }
    }

    /// Samples the gradient at `t`, clamping outside the covered range.
    /// An empty gradient evaluates to opaque white.
    pub fn sample(&self, t: f32) -> [f32; 4] {
        let Some(first) = self.stops.first() else {
            return [1.0, 1.0, 1.0, 1.0];
        };
        let t = t.clamp(0.0, 1.0);
        if t <= first.position {
            return first.color;
        }
        for pair in self.stops.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if t <= b.position {
                let span = b.position - a.position;
                if span <= f32::EPSILON {
                    return b.color;
                }
                let local = (t - a.position) / span;
                let local = match self.interpolation {
                    GradientInterpolation::Linear => local,
                    GradientInterpolation::Steps => {
                        return if t < b.position { a.color } else { b.color };
                    }
                    GradientInterpolation::Smoothstep => local * local * (3.0 - 2.0 * local),
                };
                return lerp_color(a.color, b.color, local);
            }
        }
        self.stops[self.stops.len() - 1].color
    }
}

fn lerp_color(a: [f32; 4], b: [f32; 4], t: f32) -> [f32; 4] {
    [
        a[0] + (b[0] - a[0]) * t,
        a[1] + (b[1] - a[1]) * t,
        a[2] + (b[2] - a[2]) * t,
        a[3] + (b[3] - a[3]) * t,
    ]
}

/// Either a fixed color or a random draw from a gradient at spawn time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Reflect)]
pub enum ColorDistribution {
    Solid([f32; 4]),
    Gradient(Gradient),
}

impl Default for ColorDistribution {
    fn default() -> Self {
        Self::Solid([1.0, 1.0, 1.0, 1.0])
    }
}

impl ColorDistribution {
    pub fn sample<R: Rng>(&self, rng: &mut R) -> [f32; 4] {
        match self {
            Self::Solid(color) => *color,
            Self::Gradient(gradient) => gradient.sample(rng.gen_range(0.0..1.0f32)),
        }
    }
}
