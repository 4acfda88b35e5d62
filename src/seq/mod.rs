pub mod alphabet;
pub mod quality;
pub mod sequence;

pub use alphabet::Alphabet;
pub use quality::QualityScores;
pub use sequence::Sequence;
