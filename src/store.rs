use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::model::{
    admin::{AdminRole, AuditLog, SystemSettings},
    approval::Approval,
    email_template::EmailTemplate,
    employee::Employee,
    invoice::Invoice,
    leave_request::LeaveRequest,
    license::License,
    onboarding::OnboardingRecord,
    project::{Project, Task},
    smtp_account::{SentEmail, SmtpAccount},
    timesheet::Timesheet,
    user::DirectoryUser,
};

pub mod seed;

/// Anything stored in a [`Table`] is addressed by an integer id.
pub trait Record: Clone {
    fn id(&self) -> u64;
}

/// An in-memory array with an auto-incrementing id counter.
///
/// Rows are returned by value so callers never hold the lock across an await.
pub struct Table<T> {
    rows: RwLock<Vec<T>>,
    next_id: AtomicU64,
}

impl<T: Record> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }
}

impl<T: Record> Table<T> {
    /// Allocates the next id and stores the record built from it.
    pub fn insert_with(&self, build: impl FnOnce(u64) -> T) -> T {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let record = build(id);
        self.rows.write().push(record.clone());
        record
    }

    pub fn all(&self) -> Vec<T> {
        self.rows.read().clone()
    }

    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn find(&self, id: u64) -> Option<T> {
        self.rows.read().iter().find(|r| r.id() == id).cloned()
    }

    pub fn find_by(&self, pred: impl Fn(&T) -> bool) -> Option<T> {
        self.rows.read().iter().find(|r| pred(r)).cloned()
    }

    pub fn filter(&self, pred: impl Fn(&T) -> bool) -> Vec<T> {
        self.rows.read().iter().filter(|r| pred(r)).cloned().collect()
    }

    /// Applies `f` to the record with `id`, returning the updated copy.
    pub fn update(&self, id: u64, f: impl FnOnce(&mut T)) -> Option<T> {
        let mut rows = self.rows.write();
        let row = rows.iter_mut().find(|r| r.id() == id)?;
        f(row);
        Some(row.clone())
    }

    /// Like [`Table::update`] but the closure may reject the change.
    pub fn try_update<E>(
        &self,
        id: u64,
        f: impl FnOnce(&mut T) -> Result<(), E>,
    ) -> Result<Option<T>, E> {
        let mut rows = self.rows.write();
        let Some(row) = rows.iter_mut().find(|r| r.id() == id) else {
            return Ok(None);
        };
        f(row)?;
        Ok(Some(row.clone()))
    }

    /// Applies `f` to every matching record (last write wins).
    pub fn update_where(&self, pred: impl Fn(&T) -> bool, f: impl Fn(&mut T)) -> Vec<T> {
        let mut rows = self.rows.write();
        rows.iter_mut()
            .filter(|r| pred(r))
            .map(|r| {
                f(r);
                r.clone()
            })
            .collect()
    }

    pub fn remove(&self, id: u64) -> Option<T> {
        let mut rows = self.rows.write();
        let index = rows.iter().position(|r| r.id() == id)?;
        Some(rows.remove(index))
    }
}

/// Every business entity the server keeps. Nothing here survives a restart.
#[derive(Default)]
pub struct AppStore {
    pub employees: Table<Employee>,
    pub timesheets: Table<Timesheet>,
    pub leave_requests: Table<LeaveRequest>,
    pub invoices: Table<Invoice>,
    pub onboarding: Table<OnboardingRecord>,
    pub approvals: Table<Approval>,
    pub email_templates: Table<EmailTemplate>,
    pub smtp_accounts: Table<SmtpAccount>,
    pub sent_emails: Table<SentEmail>,
    pub projects: Table<Project>,
    pub tasks: Table<Task>,
    pub admin_roles: Table<AdminRole>,
    pub audit_logs: Table<AuditLog>,
    pub users: Table<DirectoryUser>,
    pub license: RwLock<License>,
    pub settings: RwLock<SystemSettings>,
}

impl AppStore {
    /// A store holding only the login directory, reference data and
    /// configuration rows (SMTP accounts, roles, templates, license).
    pub fn new() -> Self {
        let store = Self::default();
        seed::load_reference_data(&store);
        store
    }

    /// Reference data plus the demo timesheets the UI expects on first run.
    pub fn with_demo_data() -> Self {
        let store = Self::new();
        seed::load_demo_timesheets(&store);
        store
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Row {
        id: u64,
        label: &'static str,
    }

    impl Record for Row {
        fn id(&self) -> u64 {
            self.id
        }
    }

    #[test]
    fn ids_keep_increasing_after_removal() {
        let table = Table::<Row>::default();
        let a = table.insert_with(|id| Row { id, label: "a" });
        let b = table.insert_with(|id| Row { id, label: "b" });
        assert_eq!((a.id, b.id), (1, 2));

        assert_eq!(table.remove(2), Some(b));
        let c = table.insert_with(|id| Row { id, label: "c" });
        assert_eq!(c.id, 3);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn update_where_touches_every_match() {
        let table = Table::<Row>::default();
        for label in ["x", "y", "x"] {
            table.insert_with(|id| Row { id, label });
        }

        let updated = table.update_where(|r| r.label == "x", |r| r.label = "z");
        assert_eq!(updated.len(), 2);
        assert_eq!(table.filter(|r| r.label == "z").len(), 2);
        assert!(table.update(99, |r| r.label = "nope").is_none());
    }

    #[test]
    fn fresh_store_has_no_business_records() {
        let store = AppStore::new();
        assert_eq!(store.employees.len(), 0);
        assert_eq!(store.timesheets.len(), 0);
        assert_eq!(store.invoices.len(), 0);
        assert_eq!(store.smtp_accounts.len(), 5);
    }

    #[test]
    fn demo_store_seeds_four_weeks() {
        let store = AppStore::with_demo_data();
        assert_eq!(store.timesheets.len(), 4);
    }
}
