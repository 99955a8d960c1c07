//! Request handlers
//!
//! Turns typed inputs into table calls and shapes the outputs: return-value
//! selection and consumed-capacity accounting live here, not in the table.

use crate::database::Database;
use crate::error::{DbError, Result};
use crate::model::{AttributeUpdates, Item, ItemSize, KeySchema};
use crate::table::TableSpec;

use super::command::*;
use super::response::*;

/// Most keys a single BatchGetItem may carry
pub const MAX_BATCH_GET_KEYS: usize = 100;

/// Most writes a single BatchWriteItem may carry
pub const MAX_BATCH_WRITES: usize = 25;

// =============================================================================
// Helpers
// =============================================================================

fn check_limit(limit: Option<usize>) -> Result<()> {
    if limit == Some(0) {
        return Err(DbError::Validation(
            "Limit must be greater than or equal to 1".into(),
        ));
    }
    Ok(())
}

/// Put and delete only know about the whole previous item
fn check_simple_return_values(return_values: ReturnValues) -> Result<()> {
    match return_values {
        ReturnValues::None | ReturnValues::AllOld => Ok(()),
        other => Err(DbError::Validation(format!(
            "ReturnValues {} is only valid for UpdateItem",
            other.as_str()
        ))),
    }
}

/// The old item, unless it was never stored
fn existing(old: Item) -> Option<Item> {
    (!old.is_phantom()).then_some(old)
}

/// Write units billed for replacing `old` with `new`
fn write_units(old: &Item, new: &Item) -> f64 {
    old.size().as_units().max(new.size().as_units()) as f64
}

/// Read units billed for a single get; a miss still costs the base rate
fn get_units(item: Option<&Item>, consistent: bool) -> f64 {
    match item {
        Some(item) => item.size().read_capacity(consistent),
        None => ItemSize::default().read_capacity(consistent),
    }
}

fn updated_attributes(item: &Item, actions: &AttributeUpdates) -> Item {
    let names: Vec<String> = actions.keys().cloned().collect();
    item.filter(&names)
}

// =============================================================================
// Table operations
// =============================================================================

pub(crate) fn create_table(db: &Database, input: CreateTableInput) -> Result<CreateTableOutput> {
    let schema = KeySchema::from_elements(&input.key_schema, &input.attribute_definitions)?;
    let spec = TableSpec::new(input.table_name, schema, input.provisioned_throughput);

    Ok(CreateTableOutput {
        table_description: db.create_table(spec)?,
    })
}

pub(crate) fn describe_table(db: &Database, input: DescribeTableInput) -> Result<DescribeTableOutput> {
    Ok(DescribeTableOutput {
        table: db.describe_table(&input.table_name)?,
    })
}

pub(crate) fn list_tables(db: &Database, input: ListTablesInput) -> Result<ListTablesOutput> {
    check_limit(input.limit)?;

    let mut names: Vec<String> = db
        .list_tables()
        .into_iter()
        .filter(|name| {
            input
                .exclusive_start_table_name
                .as_ref()
                .map_or(true, |start| name > start)
        })
        .collect();

    let mut last_evaluated_table_name = None;
    if let Some(limit) = input.limit {
        if names.len() > limit {
            names.truncate(limit);
            last_evaluated_table_name = names.last().cloned();
        }
    }

    Ok(ListTablesOutput {
        table_names: names,
        last_evaluated_table_name,
    })
}

pub(crate) fn update_table(db: &Database, input: UpdateTableInput) -> Result<UpdateTableOutput> {
    Ok(UpdateTableOutput {
        table_description: db.update_table(&input.table_name, input.provisioned_throughput)?,
    })
}

pub(crate) fn delete_table(db: &Database, input: DeleteTableInput) -> Result<DeleteTableOutput> {
    Ok(DeleteTableOutput {
        table_description: db.delete_table(&input.table_name)?,
    })
}

// =============================================================================
// Item operations
// =============================================================================

pub(crate) fn put_item(db: &Database, input: PutItemInput) -> Result<PutItemOutput> {
    check_simple_return_values(input.return_values)?;
    let table = db.get_table(&input.table_name)?;

    let (old, new) = table.put(input.item, input.expected.as_ref())?;
    let consumed_capacity_units = write_units(&old, &new);

    let attributes = match input.return_values {
        ReturnValues::AllOld => existing(old),
        _ => None,
    };

    Ok(PutItemOutput {
        consumed_capacity_units,
        attributes,
    })
}

pub(crate) fn get_item(db: &Database, input: GetItemInput) -> Result<GetItemOutput> {
    let table = db.get_table(&input.table_name)?;
    let full = table.get(&input.key, &[])?;

    // Billed on the stored item, not the projection
    Ok(GetItemOutput {
        consumed_capacity_units: get_units(full.as_ref(), input.consistent_read),
        item: full.map(|item| item.filter(&input.attributes_to_get)),
    })
}

pub(crate) fn update_item(db: &Database, input: UpdateItemInput) -> Result<UpdateItemOutput> {
    let table = db.get_table(&input.table_name)?;

    let (old, new) = table.update_item(&input.key, &input.attribute_updates, input.expected.as_ref())?;
    let consumed_capacity_units = write_units(&old, &new);

    let attributes = match input.return_values {
        ReturnValues::None => None,
        ReturnValues::AllOld => existing(old),
        ReturnValues::UpdatedOld => existing(old).map(|old| updated_attributes(&old, &input.attribute_updates)),
        ReturnValues::AllNew => Some(new),
        ReturnValues::UpdatedNew => Some(updated_attributes(&new, &input.attribute_updates)),
    };

    Ok(UpdateItemOutput {
        consumed_capacity_units,
        attributes,
    })
}

pub(crate) fn delete_item(db: &Database, input: DeleteItemInput) -> Result<DeleteItemOutput> {
    check_simple_return_values(input.return_values)?;
    let table = db.get_table(&input.table_name)?;

    let old = table.delete_item(&input.key, input.expected.as_ref())?;
    let consumed_capacity_units = old.size().write_capacity();

    let attributes = match input.return_values {
        ReturnValues::AllOld => existing(old),
        _ => None,
    };

    Ok(DeleteItemOutput {
        consumed_capacity_units,
        attributes,
    })
}

pub(crate) fn query(db: &Database, input: QueryInput) -> Result<QueryOutput> {
    check_limit(input.limit)?;
    let table = db.get_table(&input.table_name)?;

    let results = table.query(
        &input.hash_key_value,
        input.range_key_condition.as_ref(),
        &input.attributes_to_get,
        input.limit,
        !input.scan_index_forward,
    )?;

    Ok(QueryOutput {
        count: results.items.len(),
        consumed_capacity_units: results.size.read_capacity(input.consistent_read),
        items: results.items,
    })
}

pub(crate) fn scan(db: &Database, input: ScanInput) -> Result<ScanOutput> {
    check_limit(input.limit)?;
    let table = db.get_table(&input.table_name)?;

    let results = table.scan(input.scan_filter.as_ref(), &input.attributes_to_get, input.limit)?;

    // Scans are always eventually consistent
    Ok(ScanOutput {
        count: results.items.len(),
        scanned_count: results.scanned,
        consumed_capacity_units: results.size.read_capacity(false),
        items: results.items,
    })
}

// =============================================================================
// Batch operations
// =============================================================================

pub(crate) fn batch_get_item(db: &Database, input: BatchGetItemInput) -> Result<BatchGetItemOutput> {
    let total: usize = input.request_items.values().map(|r| r.keys.len()).sum();
    if total == 0 || total > MAX_BATCH_GET_KEYS {
        return Err(DbError::Validation(format!(
            "BatchGetItem must request between 1 and {} keys, got {}",
            MAX_BATCH_GET_KEYS, total
        )));
    }

    // Resolve every table first so an unknown name fails the whole batch
    let batch = input
        .request_items
        .into_iter()
        .map(|(name, request)| Ok((db.get_table(&name)?, name, request)))
        .collect::<Result<Vec<_>>>()?;

    let mut output = BatchGetItemOutput::default();
    for (table, name, request) in batch {
        let entry = output.responses.entry(name).or_default();

        for key in &request.keys {
            let full = table.get(key, &[])?;
            entry.consumed_capacity_units += get_units(full.as_ref(), request.consistent_read);
            if let Some(item) = full {
                entry.items.push(item.filter(&request.attributes_to_get));
            }
        }
    }

    tracing::debug!(keys = total, tables = output.responses.len(), "batch_get_item");
    Ok(output)
}

pub(crate) fn batch_write_item(db: &Database, input: BatchWriteItemInput) -> Result<BatchWriteItemOutput> {
    let total: usize = input.request_items.values().map(Vec::len).sum();
    if total == 0 || total > MAX_BATCH_WRITES {
        return Err(DbError::Validation(format!(
            "BatchWriteItem must carry between 1 and {} requests, got {}",
            MAX_BATCH_WRITES, total
        )));
    }

    let batch = input
        .request_items
        .into_iter()
        .map(|(name, requests)| Ok((db.get_table(&name)?, name, requests)))
        .collect::<Result<Vec<_>>>()?;

    // Writes are unconditional, so a batch that passes here applies in full
    for (table, _, requests) in &batch {
        for request in requests {
            match request {
                WriteRequest::PutRequest { item } => table.validate_item(item)?,
                WriteRequest::DeleteRequest { key } => table.validate_key(key)?,
            }
        }
    }

    let mut output = BatchWriteItemOutput::default();
    for (table, name, requests) in batch {
        let entry = output.responses.entry(name).or_default();

        for request in requests {
            entry.consumed_capacity_units += match request {
                WriteRequest::PutRequest { item } => {
                    let (old, new) = table.put(item, None)?;
                    write_units(&old, &new)
                }
                WriteRequest::DeleteRequest { key } => table.delete_item(&key, None)?.size().write_capacity(),
            };
        }
    }

    tracing::debug!(writes = total, tables = output.responses.len(), "batch_write_item");
    Ok(output)
}
