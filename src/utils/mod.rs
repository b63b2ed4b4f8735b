pub mod time;

/// Generate a long random id used for runs.
pub fn longid() -> String {
    nanoid::nanoid!(21)
}
