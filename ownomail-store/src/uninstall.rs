use ownomail_common::{admin, keys};

use crate::{Result, r#trait::ConfigStore, value::Scope};

/// Erase every OwnOmail option from both the site and the network scope.
///
/// There is no confirmation and no backup. Returns the number of entries that
/// were actually present.
///
/// # Errors
/// Stops at the first storage failure; options deleted before it stay deleted.
pub fn uninstall(store: &dyn ConfigStore) -> Result<usize> {
    let mut removed = 0;

    for scope in Scope::ALL {
        for key in keys::ALL {
            if store.delete(scope, key)? {
                removed += 1;
            }
        }
    }

    admin!(level = INFO, removed, "Removed OwnOmail options");
    Ok(removed)
}
