pub mod directory;
pub mod memory;
pub mod postgrest;
pub mod repository;
pub mod supabase;

pub use directory::{SupabaseDirectory, UserDirectory};
pub use memory::MemoryRepository;
pub use postgrest::SupabaseRepository;
pub use repository::{AppointmentFilter, ClinicRepository, RecordFilter, StoreError};
pub use supabase::SupabaseClient;
