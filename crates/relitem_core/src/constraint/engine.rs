//! Change classification, constraint checks, cascades and triggers.

use super::{ForeignKey, OnChangePolicy, TriggerItems, TriggerPoint};
use crate::error::{Capability, DocError, DocResult};
use crate::manager::DocumentManager;
use crate::transaction::Transaction;
use relitem_storage::{Item, Value};
use tracing::debug;

/// Runs the full pipeline for one change and stages it.
///
/// Returns the staged new version, which Before* triggers may have edited,
/// or `None` for deletions and no-ops.
pub(crate) fn process_change(
    txn: &mut Transaction<'_>,
    new: Option<Item>,
    old: Option<Item>,
    qualifier: &str,
) -> DocResult<Option<Item>> {
    if !txn.manager().registry().contains(qualifier) {
        return Err(DocError::unregistered(qualifier, Capability::Setter));
    }
    if let Some(old) = &old {
        if old.qualifier() != qualifier {
            return Err(DocError::id_constraint(format!(
                "Old item \"{}\" is inconsistent with qualifier \"{qualifier}\".",
                old.qualified_id()
            )));
        }
    }
    if let Some(new) = &new {
        if new.qualifier() != qualifier {
            return Err(DocError::id_constraint(format!(
                "New item \"{}\" is inconsistent with qualifier \"{qualifier}\".",
                new.qualified_id()
            )));
        }
    }

    // Only the id of the caller's old item is trusted.
    let current = old.and_then(|old| txn.item_by_id(qualifier, old.id()));
    match (new, current) {
        (None, None) => Ok(None),
        (Some(new), None) => create(txn, new, qualifier).map(Some),
        (None, Some(old)) => delete(txn, &old, qualifier).map(|()| None),
        (Some(new), Some(old)) => update(txn, new, &old, qualifier).map(Some),
    }
}

fn create(txn: &mut Transaction<'_>, mut new: Item, qualifier: &str) -> DocResult<Item> {
    run_triggers(txn, qualifier, TriggerPoint::BeforeCreate, Some(&mut new), None)?;
    check_ids(txn, &new, None, qualifier)?;
    check_references(txn, &new, "create", new.id(), qualifier)?;
    txn.stage(Some(new.clone()), None, qualifier)?;
    run_triggers(
        txn,
        qualifier,
        TriggerPoint::AfterCreate,
        Some(&mut new.clone()),
        None,
    )?;
    Ok(new)
}

fn update(txn: &mut Transaction<'_>, mut new: Item, old: &Item, qualifier: &str) -> DocResult<Item> {
    let proposed = new.clone();
    check_update(txn, &new, old, qualifier)?;
    run_triggers(txn, qualifier, TriggerPoint::BeforeUpdate, Some(&mut new), Some(old))?;
    if !new.ptr_eq(&proposed) {
        check_update(txn, &new, old, qualifier)?;
    }
    txn.stage(Some(new.clone()), Some(old.clone()), qualifier)?;
    cascade_update(txn, &new, old, qualifier)?;
    run_triggers(
        txn,
        qualifier,
        TriggerPoint::AfterUpdate,
        Some(&mut new.clone()),
        Some(old),
    )?;
    Ok(new)
}

fn delete(txn: &mut Transaction<'_>, old: &Item, qualifier: &str) -> DocResult<()> {
    let dm = txn.manager();
    for fk in incoming(dm, qualifier).filter(|fk| fk.on_delete.blocks()) {
        let dependents = dependents(txn, fk, old).len();
        if dependents > 0 {
            return Err(still_referenced("delete", old, dependents, fk));
        }
    }
    run_triggers(txn, qualifier, TriggerPoint::BeforeDelete, None, Some(old))?;
    txn.stage(None, Some(old.clone()), qualifier)?;
    for fk in incoming(dm, qualifier).filter(|fk| fk.on_delete.cascades()) {
        for dependent in dependents(txn, fk, old) {
            debug!(
                item = %dependent.qualified_id(),
                referenced = %old.qualified_id(),
                "cascading delete"
            );
            txn.change_item(None, Some(dependent), &fk.source_qualifier)?;
        }
    }
    run_triggers(txn, qualifier, TriggerPoint::AfterDelete, None, Some(old))
}

fn check_update(txn: &Transaction<'_>, new: &Item, old: &Item, qualifier: &str) -> DocResult<()> {
    check_ids(txn, new, Some(old.id()), qualifier)?;
    check_references(txn, new, "change", old.id(), qualifier)?;
    for fk in incoming(txn.manager(), qualifier).filter(|fk| fk.on_update.blocks()) {
        if !key_changed(fk, new, old) {
            continue;
        }
        let dependents = dependents(txn, fk, old).len();
        if dependents > 0 {
            return Err(still_referenced("change", old, dependents, fk));
        }
    }
    Ok(())
}

fn check_ids(
    txn: &Transaction<'_>,
    new: &Item,
    old_id: Option<&str>,
    qualifier: &str,
) -> DocResult<()> {
    if new.id().is_empty() {
        return Err(DocError::id_constraint("Id cannot be empty."));
    }
    if old_id != Some(new.id()) && txn.item_by_id(qualifier, new.id()).is_some() {
        return Err(DocError::id_constraint(format!(
            "New id is already used by another {qualifier}: {}",
            new.id()
        )));
    }
    Ok(())
}

/// Every non-empty outgoing reference must resolve in the transaction view.
fn check_references(
    txn: &Transaction<'_>,
    new: &Item,
    verb: &str,
    id: &str,
    qualifier: &str,
) -> DocResult<()> {
    for fk in txn
        .manager()
        .foreign_keys()
        .iter()
        .filter(|fk| fk.source_qualifier == qualifier)
    {
        let reference_id = new.text(fk.source_field);
        if !reference_id.is_empty()
            && txn
                .item_by_id(&fk.reference_qualifier, &reference_id)
                .is_none()
        {
            return Err(DocError::MissingReference {
                message: format!(
                    "Cannot {verb} {qualifier} \"{id}\" because there is no {} with id \"{reference_id}\".",
                    fk.reference_qualifier
                ),
                reference_qualifier: fk.reference_qualifier.clone(),
                reference_id: reference_id.into_owned(),
            });
        }
    }
    Ok(())
}

fn cascade_update(
    txn: &mut Transaction<'_>,
    new: &Item,
    old: &Item,
    qualifier: &str,
) -> DocResult<()> {
    let dm = txn.manager();
    for fk in incoming(dm, qualifier).filter(|fk| fk.on_update.cascades()) {
        if fk.on_update != OnChangePolicy::CascadeAnySection && !key_changed(fk, new, old) {
            continue;
        }
        let value = Value::from(new.id());
        for dependent in dependents(txn, fk, old) {
            if !txn.mark_cascaded(&fk.source_qualifier, dependent.id(), fk.source_field) {
                debug!(
                    item = %dependent.qualified_id(),
                    field = fk.source_field,
                    "skipping cascade already applied in this change"
                );
                continue;
            }
            debug!(
                item = %dependent.qualified_id(),
                referenced = %new.qualified_id(),
                "cascading update"
            );
            txn.change_field(&dependent, fk.source_field, value.clone())?;
        }
    }
    Ok(())
}

fn run_triggers(
    txn: &mut Transaction<'_>,
    qualifier: &str,
    point: TriggerPoint,
    mut new: Option<&mut Item>,
    old: Option<&Item>,
) -> DocResult<()> {
    let dm = txn.manager();
    for trigger in dm.triggers().get(qualifier, point) {
        let items = TriggerItems {
            new: new.as_deref_mut(),
            old,
        };
        if let Err(err) = trigger(txn, items) {
            debug!(qualifier, ?point, error = %err, "trigger refused change");
            return Err(match err {
                DocError::TriggerVetoed { .. } => err,
                other => DocError::vetoed(other.to_string()),
            });
        }
    }
    Ok(())
}

fn incoming<'a>(
    dm: &'a DocumentManager,
    qualifier: &'a str,
) -> impl Iterator<Item = &'a ForeignKey> + 'a {
    dm.foreign_keys()
        .iter()
        .filter(move |fk| fk.reference_qualifier == qualifier)
}

/// Items whose source field holds the referenced item's id.
fn dependents(txn: &Transaction<'_>, fk: &ForeignKey, referenced: &Item) -> Vec<Item> {
    txn.foreign_key_sources(&fk.source_qualifier, fk.source_field, referenced.id())
}

/// A rename always changes the key; so does a change of the referenced field.
fn key_changed(fk: &ForeignKey, new: &Item, old: &Item) -> bool {
    new.id() != old.id() || new.text(fk.reference_field) != old.text(fk.reference_field)
}

fn still_referenced(verb: &str, old: &Item, dependents: usize, fk: &ForeignKey) -> DocError {
    DocError::ReferentialIntegrity {
        message: format!(
            "Cannot {verb} {} \"{}\" because it is still referenced by {dependents} {}(s).",
            old.qualifier(),
            old.id(),
            fk.source_qualifier
        ),
        dependents,
        source_qualifier: fk.source_qualifier.clone(),
    }
}
