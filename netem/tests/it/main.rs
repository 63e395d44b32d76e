mod concurrency;
mod lifecycle;
mod stats;
