//! Bounded windows over streams
//!
//! Aggregator pipes must stay memory-bounded regardless of how long the
//! upstream stream is. The [`TrailingWindow`] keeps only the most recent
//! `capacity` items in a fixed-size ring, evicting the oldest on overflow:
//!
//! ```text
//! capacity = 3
//! push a, b, c:   [a b c]      head=0
//! push d:         [d b c]      head=1   (a evicted)
//! push e:         [d e c]      head=2   (b evicted)
//! ordered:        c d e
//! ```

pub mod ring;

pub use ring::TrailingWindow;
