pub mod record;

pub use record::SweepRecord;
