use crate::constants::lock;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy)]
struct Lease {
    token: Uuid,
    expires_at: Instant,
}

/// 按备份定义 ID 加锁的租约表
///
/// 持有者崩溃时租约到期后可被接管。
#[derive(Debug, Clone)]
pub struct LeaseLock {
    leases: Arc<DashMap<i64, Lease>>,
    ttl: Duration,
}

impl Default for LeaseLock {
    fn default() -> Self {
        Self::new(Duration::from_secs(lock::DEFAULT_LEASE_SECS))
    }
}

impl LeaseLock {
    pub fn new(ttl: Duration) -> Self {
        Self {
            leases: Arc::new(DashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// 尝试获取租约，已被他人持有且未过期时返回 None
    pub fn try_acquire(&self, definition_id: i64) -> Option<LeaseGuard> {
        let now = Instant::now();
        let lease = Lease {
            token: Uuid::new_v4(),
            expires_at: now + self.ttl,
        };

        match self.leases.entry(definition_id) {
            Entry::Occupied(mut entry) => {
                if entry.get().expires_at > now {
                    debug!(definition_id, "租约已被持有");
                    return None;
                }
                warn!(definition_id, "租约已过期，接管");
                entry.insert(lease);
            }
            Entry::Vacant(entry) => {
                entry.insert(lease);
            }
        }

        Some(LeaseGuard {
            leases: Arc::clone(&self.leases),
            definition_id,
            token: lease.token,
            ttl: self.ttl,
        })
    }

    /// 是否存在未过期的租约
    pub fn is_held(&self, definition_id: i64) -> bool {
        self.leases
            .get(&definition_id)
            .is_some_and(|lease| lease.expires_at > Instant::now())
    }
}

/// 租约持有凭证，drop 时释放
#[derive(Debug)]
pub struct LeaseGuard {
    leases: Arc<DashMap<i64, Lease>>,
    definition_id: i64,
    token: Uuid,
    ttl: Duration,
}

impl LeaseGuard {
    pub fn definition_id(&self) -> i64 {
        self.definition_id
    }

    /// 续约，把到期时间推迟一个 TTL
    ///
    /// 租约已被他人接管时返回 false，不会覆盖对方的租约。
    pub fn renew(&self) -> bool {
        match self.leases.get_mut(&self.definition_id) {
            Some(mut lease) if lease.token == self.token => {
                lease.expires_at = Instant::now() + self.ttl;
                true
            }
            _ => false,
        }
    }
}

impl Drop for LeaseGuard {
    fn drop(&mut self) {
        // 租约可能已被接管，只释放自己的
        let token = self.token;
        self.leases
            .remove_if(&self.definition_id, |_, lease| lease.token == token);
    }
}
