pub mod certificates;
pub mod mint;
pub mod pages;
