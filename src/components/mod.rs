pub mod force_graph;
pub mod progress_bar;
