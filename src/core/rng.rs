const MODULUS: i64 = 2_147_483_647;
const MULTIPLIER: i64 = 16_807;

/// Park–Miller minimal standard generator.
///
/// The recurrence and seed normalization are fixed so that a given seed yields
/// the same stream in every implementation; Monte Carlo fixtures depend on it.
#[derive(Debug, Clone)]
pub struct Lehmer {
    state: i64,
}

impl Lehmer {
    pub fn new(seed: i64) -> Self {
        let mut state = seed.rem_euclid(MODULUS);
        if state == 0 {
            state = MODULUS - 1;
        }
        Self { state }
    }

    fn next_state(&mut self) -> i64 {
        self.state = self.state * MULTIPLIER % MODULUS;
        self.state
    }

    /// Next draw in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        (self.next_state() - 1) as f64 / (MODULUS - 1) as f64
    }
}
