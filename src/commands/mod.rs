pub mod derive_qrels;
pub mod export_tsv;
pub mod generate;
pub mod index;
pub mod qpp;
pub mod score_answers;
