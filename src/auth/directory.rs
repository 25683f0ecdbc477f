use once_cell::sync::Lazy;
use tracing::error;

use crate::auth::password::hash_password;
use crate::model::user::DirectoryUser;

/// email, password, display name, admin-console role
const DIRECTORY: &[(&str, &str, &str, &str)] = &[
    ("admin@example.com", "Password123", "admin", "admin"),
    ("manager@example.com", "manager123", "manager", "manager"),
    ("user@example.com", "Password123", "user", "employee"),
];

/// Hashed once per process.
static DIRECTORY_USERS: Lazy<Vec<DirectoryUser>> = Lazy::new(|| {
    DIRECTORY
        .iter()
        .enumerate()
        .map(|(i, (email, password, name, role))| DirectoryUser {
            id: i as u64 + 1,
            email: email.to_string(),
            name: name.to_string(),
            role: role.to_string(),
            password_hash: hash_password(password).unwrap_or_else(|e| {
                error!(error = %e, email, "Failed to hash directory password");
                String::new()
            }),
        })
        .collect()
});

pub fn directory_users() -> Vec<DirectoryUser> {
    DIRECTORY_USERS.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::verify_password;

    #[test]
    fn directory_passwords_verify() {
        let users = directory_users();
        assert_eq!(users.len(), 3);
        let manager = users.iter().find(|u| u.email == "manager@example.com").unwrap();
        assert!(verify_password("manager123", &manager.password_hash).is_ok());
        assert_eq!(manager.role, "manager");
    }
}
