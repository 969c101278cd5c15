mod run_repo;

pub use run_repo::RunRepo;
