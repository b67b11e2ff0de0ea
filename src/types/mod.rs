pub mod certificate;
pub mod mint;
