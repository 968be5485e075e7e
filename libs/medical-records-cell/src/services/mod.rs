pub mod access;
pub mod lab_reports;
pub mod records;
pub mod storage;
