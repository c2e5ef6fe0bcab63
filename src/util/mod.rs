//! Small cross-cutting helpers.

pub mod clock;
