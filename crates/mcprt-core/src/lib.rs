//! Systems-level primitives shared across the mcprt MCP server runtime:
//! a buffer pool, a cache-line-padded read-write lock, a generic
//! open-addressed hash table, and process-wide metrics (spec §4.1, §4.2,
//! and the "Hash table" / §4.10 components).

pub mod buffer_pool;
pub mod hash_table;
pub mod metrics;
pub mod rwlock;

pub use buffer_pool::{BufferPool, PooledBuffer, BUFFER_POOL_MAGIC};
pub use hash_table::HashTable;
pub use metrics::{MetricsSnapshot, RequestOutcome, ServerMetrics};
pub use rwlock::ShardedRwLock;
