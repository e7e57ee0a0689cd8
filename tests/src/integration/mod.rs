//! Cross-service integration flows.

#[cfg(test)]
mod support;

#[cfg(test)]
mod identity;

#[cfg(test)]
mod two_phase;
