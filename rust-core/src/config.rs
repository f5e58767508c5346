// Constants

// Environments
pub const DEFAULT_NUM_NEIGHBORS: usize = 12; // Neighbors per environment unless configured otherwise
pub const MOTIF_LABEL: usize = 0; // Element id (and label) of the motif in a match_motif run

// Thresholds
pub const MAX_SENSIBLE_THRESHOLD: f64 = 2.0; // Unitless thresholds at or above this match everything
