//! Configuration validation.
//!
//! Checks a [`SimulationConfig`] before any lock, queue or thread is
//! created, so a simulation never runs half-initialized. Detects:
//! - Inverted ranges (min > max)
//! - Probabilities outside [0, 1]
//! - Zero capacities and zero divisors
//! - A startup quantum outside its bounds
//! - Chambers too small to hold both zones

use crate::config::{ColonyConfig, SchedulerConfig, SimulationConfig};

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// Smallest chamber side with non-empty nursery and storage zones.
pub const MIN_CHAMBER_SIZE: usize = 4;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// A `min` bound exceeds its `max`.
    InvalidRange,
    /// A probability lies outside [0, 1].
    InvalidProbability,
    /// A capacity or count that must be positive is zero.
    ZeroCapacity,
    /// The startup quantum lies outside its bounds.
    QuantumOutOfBounds,
    /// The chamber cannot hold both zones.
    ChamberTooSmall,
}

impl ValidationError {
    pub(crate) fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates a full simulation configuration.
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with every detected issue.
pub fn validate_config(config: &SimulationConfig) -> ValidationResult {
    let mut errors = Vec::new();

    check_scheduler(&config.scheduler, &mut errors);
    check_colony(&config.colony, &mut errors);

    if config.registry_capacity == 0 {
        errors.push(ValidationError::new(
            ValidationErrorKind::ZeroCapacity,
            "registry capacity must be positive",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validates scheduler parameters on their own.
pub fn validate_scheduler(config: &SchedulerConfig) -> ValidationResult {
    let mut errors = Vec::new();
    check_scheduler(config, &mut errors);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validates colony parameters on their own.
pub fn validate_colony(config: &ColonyConfig) -> ValidationResult {
    let mut errors = Vec::new();
    check_colony(config, &mut errors);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_scheduler(s: &SchedulerConfig, errors: &mut Vec<ValidationError>) {
    positive(s.ready_capacity as u64, "ready_capacity", errors);
    positive(s.io_capacity as u64, "io_capacity", errors);
    positive(s.quantum_min_ms, "quantum_min_ms", errors);
    positive(s.timer_tick_ms, "timer_tick_ms", errors);
    positive(s.watcher_poll_ms, "watcher_poll_ms", errors);
    positive(s.io_retry_backoff_ms, "io_retry_backoff_ms", errors);

    range(s.quantum_min_ms, s.quantum_max_ms, "quantum", errors);
    range(s.io_wait_min_ms, s.io_wait_max_ms, "io_wait", errors);
    probability(s.io_probability, "io_probability", errors);

    if s.quantum_min_ms <= s.quantum_max_ms
        && !(s.quantum_min_ms..=s.quantum_max_ms).contains(&s.initial_quantum_ms)
    {
        errors.push(ValidationError::new(
            ValidationErrorKind::QuantumOutOfBounds,
            format!(
                "initial quantum {}ms outside [{}, {}]",
                s.initial_quantum_ms, s.quantum_min_ms, s.quantum_max_ms
            ),
        ));
    }
}

fn check_colony(c: &ColonyConfig, errors: &mut Vec<ValidationError>) {
    positive(u64::from(c.initial_population), "initial_population", errors);
    positive(c.conversion_ratio, "conversion_ratio", errors);
    positive(c.quota_min, "quota_min", errors);

    if c.chamber_size < MIN_CHAMBER_SIZE {
        errors.push(ValidationError::new(
            ValidationErrorKind::ChamberTooSmall,
            format!(
                "chamber size {} below minimum {MIN_CHAMBER_SIZE}",
                c.chamber_size
            ),
        ));
    }

    range(c.input_min, c.input_max, "input", errors);
    range(c.collect_delay_min_ms, c.collect_delay_max_ms, "collect_delay", errors);
    range(c.quota_min, c.quota_max, "quota", errors);
    range(c.hatch_delay_min_ms, c.hatch_delay_max_ms, "hatch_delay", errors);

    probability(c.lay_probability, "lay_probability", errors);
    probability(c.queen_probability, "queen_probability", errors);
    probability(c.scout_probability, "scout_probability", errors);
    probability(c.queen_departure_probability, "queen_departure_probability", errors);
    probability(c.direct_growth_probability, "direct_growth_probability", errors);

    if c.queen_probability + c.scout_probability > 1.0 {
        errors.push(ValidationError::new(
            ValidationErrorKind::InvalidProbability,
            "queen_probability + scout_probability exceeds 1",
        ));
    }
}

fn positive(value: u64, name: &str, errors: &mut Vec<ValidationError>) {
    if value == 0 {
        errors.push(ValidationError::new(
            ValidationErrorKind::ZeroCapacity,
            format!("{name} must be positive"),
        ));
    }
}

fn range(min: u64, max: u64, name: &str, errors: &mut Vec<ValidationError>) {
    if min > max {
        errors.push(ValidationError::new(
            ValidationErrorKind::InvalidRange,
            format!("{name} range inverted: min {min} > max {max}"),
        ));
    }
}

fn probability(p: f64, name: &str, errors: &mut Vec<ValidationError>) {
    if !(0.0..=1.0).contains(&p) {
        errors.push(ValidationError::new(
            ValidationErrorKind::InvalidProbability,
            format!("{name} = {p} outside [0, 1]"),
        ));
    }
}
