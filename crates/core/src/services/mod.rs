mod paginator;

pub use paginator::paginate;
