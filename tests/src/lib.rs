//! End-to-end runs of the engine against scripted networks.
#![cfg(test)]

mod support;
mod v4;
mod v6;
