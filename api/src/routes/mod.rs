pub mod hackrx;
pub mod health;
pub mod process_pdf;
