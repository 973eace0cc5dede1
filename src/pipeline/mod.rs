// Batch pipelines built on the moderation engine.

pub mod scan;
