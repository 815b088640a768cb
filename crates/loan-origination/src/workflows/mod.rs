pub mod origination;
