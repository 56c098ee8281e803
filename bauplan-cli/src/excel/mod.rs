//! Workbook I/O
//!
//! Reading and writing `.xlsx` workbooks, plus the formatting scan that
//! calamine cannot do: detecting strikethrough on individual cells.

pub mod reader;
pub mod strike;
pub mod writer;

pub use reader::read_sheet;
pub use strike::struck_rows;
pub use writer::write_table;
