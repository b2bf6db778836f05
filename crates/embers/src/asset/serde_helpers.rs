use bevy::prelude::*;

pub fn is_false(value: &bool) -> bool {
    !*value
}

pub fn is_true(value: &bool) -> bool {
    *value
}

pub fn is_one_f32(value: &f32) -> bool {
    *value == 1.0
}

pub fn is_zero_vec3(value: &Vec3) -> bool {
    *value == Vec3::ZERO
}

pub fn default_true() -> bool {
    true
}

pub fn default_one_f32() -> f32 {
    1.0
}
