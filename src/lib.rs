//! Pawbook payments core.
//!
//! Payment lifecycle for the pawbook pet-care marketplace: fee computation,
//! manual-capture authorization management, and completion/payout
//! reconciliation between clients (pet owners) and contractors (care
//! providers).

pub mod config;
pub mod fees;
pub mod interfaces;
pub mod processor;
pub mod services;
pub mod storage;
pub mod utils;

pub mod proto {
    tonic::include_proto!("pawbook");
}
