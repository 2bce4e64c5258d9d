//! Creation and lifecycle of inventory documents.
//!
//! Creates take the number the client obtained from the allocator (or its own
//! fallback). The allocation is not a reservation, so an insert can still hit the
//! unique constraint on the number column; the service then allocates again and
//! retries up to the configured number of attempts.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use db::models::{
    adjustment::{Adjustment, AdjustmentDetail, CreateAdjustment, NewAdjustment},
    delivery::{CreateDelivery, Delivery, DeliveryWithItems},
    document::{DocumentStatus, find_status, transition_status},
    document_number::is_number_conflict,
    product::{CreateProduct, Product},
    receipt::{CreateReceipt, Receipt, ReceiptWithItems},
    stock_level::StockLevel,
    transfer::{CreateTransfer, Transfer, TransferWithItems},
    warehouse::Warehouse,
};
use sqlx::{SqliteConnection, SqlitePool};
use thiserror::Error;
use tracing::{info, warn};
use utils::document_number::{DocumentKind, PrefixTable};

use super::{
    clock::Clock,
    numbering::{NumberAllocator, NumberingError},
};

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Numbering(#[from] NumberingError),
    #[error("{0}")]
    Validation(String),
    #[error("{kind} {id} not found")]
    NotFound { kind: DocumentKind, id: i64 },
    #[error("{kind} number {number} is already in use")]
    DuplicateNumber { kind: DocumentKind, number: String },
    #[error("{kind} {id} is already {status}")]
    InvalidStatus {
        kind: DocumentKind,
        id: i64,
        status: DocumentStatus,
    },
    #[error(
        "insufficient stock for product {product_id} in warehouse {warehouse_id}: \
         {available} available, {requested} requested"
    )]
    InsufficientStock {
        product_id: i64,
        warehouse_id: i64,
        available: i64,
        requested: i64,
    },
}

impl DocumentError {
    fn validation(message: impl Into<String>) -> Self {
        DocumentError::Validation(message.into())
    }
}

#[derive(Clone)]
pub struct DocumentService {
    pool: SqlitePool,
    allocator: NumberAllocator<SqlitePool>,
    clock: Arc<dyn Clock>,
    insert_attempts: u32,
}

impl DocumentService {
    pub fn new(
        pool: SqlitePool,
        prefixes: PrefixTable,
        clock: Arc<dyn Clock>,
        insert_attempts: u32,
    ) -> Self {
        Self {
            allocator: NumberAllocator::new(pool.clone(), prefixes),
            pool,
            clock,
            insert_attempts: insert_attempts.max(1),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Next number candidate for `kind` at the current time
    pub async fn allocate_number(&self, kind: DocumentKind) -> Result<String, NumberingError> {
        self.allocator.allocate_next(kind, self.clock.now()).await
    }

    pub async fn create_adjustment(
        &self,
        data: &CreateAdjustment,
    ) -> Result<AdjustmentDetail, DocumentError> {
        let kind = DocumentKind::Adjustment;
        let mut number = required_number(kind, &data.adjustment_number)?;

        if data.increase_by < 0 || data.decrease_by < 0 {
            return Err(DocumentError::validation(
                "Increase and decrease quantities cannot be negative",
            ));
        }
        if data.increase_by == 0 && data.decrease_by == 0 {
            return Err(DocumentError::validation(
                "Either increase or decrease quantity must be greater than zero",
            ));
        }
        self.ensure_warehouse(data.warehouse_id).await?;

        let new_product_name = data
            .new_product_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty());
        let product = match (data.product_id, new_product_name) {
            (Some(product_id), _) => {
                self.ensure_products(&[product_id]).await?;
                AdjustedProduct::Existing(product_id)
            }
            (None, Some(name)) => AdjustedProduct::New(name),
            (None, None) => return Err(DocumentError::validation("Product is required")),
        };

        let now = self.clock.now();
        let mut attempt = 1;
        let id = loop {
            let mut tx = self.pool.begin().await?;
            let product_id = match product {
                AdjustedProduct::Existing(product_id) => product_id,
                AdjustedProduct::New(name) => {
                    Product::create(&mut *tx, &CreateProduct::named(name), now)
                        .await?
                        .id
                }
            };

            let system_quantity =
                StockLevel::quantity(&mut *tx, product_id, data.warehouse_id).await?;
            let counted_quantity = system_quantity
                .checked_add(data.increase_by)
                .and_then(|quantity| quantity.checked_sub(data.decrease_by))
                .ok_or_else(quantity_out_of_range)?;
            if counted_quantity < 0 {
                return Err(DocumentError::validation(format!(
                    "Counted quantity cannot be negative (system quantity is {system_quantity})"
                )));
            }

            let row = NewAdjustment {
                adjustment_number: number.clone(),
                warehouse_id: data.warehouse_id,
                product_id,
                system_quantity,
                counted_quantity,
                reason: data.notes.clone(),
            };
            match Adjustment::create(&mut *tx, &row, now).await {
                Ok(adjustment) => {
                    tx.commit().await?;
                    break adjustment.id;
                }
                Err(err) => {
                    drop(tx);
                    number = self.retry_number(kind, number, attempt, err).await?;
                    attempt += 1;
                }
            }
        };

        info!(kind = %kind, id, "document created");
        Adjustment::find_detail(&self.pool, id)
            .await?
            .ok_or(DocumentError::NotFound { kind, id })
    }

    pub async fn create_delivery(
        &self,
        data: &CreateDelivery,
    ) -> Result<DeliveryWithItems, DocumentError> {
        let kind = DocumentKind::Delivery;
        let mut data = data.clone();
        data.delivery_number = required_number(kind, &data.delivery_number)?;

        if data.customer_name.trim().is_empty() {
            return Err(DocumentError::validation("Customer name is required"));
        }
        if data.items.is_empty() {
            return Err(DocumentError::validation("At least one item is required"));
        }
        if data.items.iter().any(|item| item.quantity <= 0) {
            return Err(DocumentError::validation(
                "Item quantities must be greater than zero",
            ));
        }
        self.ensure_warehouse(data.warehouse_id).await?;
        let product_ids: Vec<i64> = data.items.iter().map(|item| item.product_id).collect();
        self.ensure_products(&product_ids).await?;

        let now = self.clock.now();
        let mut attempt = 1;
        loop {
            let mut tx = self.pool.begin().await?;
            match Delivery::create(&mut *tx, &data, now).await {
                Ok(delivery) => {
                    tx.commit().await?;
                    info!(kind = %kind, id = delivery.id, number = %delivery.delivery_number, "document created");
                    return Ok(delivery);
                }
                Err(err) => {
                    drop(tx);
                    data.delivery_number = self
                        .retry_number(kind, data.delivery_number, attempt, err)
                        .await?;
                    attempt += 1;
                }
            }
        }
    }

    pub async fn create_receipt(
        &self,
        data: &CreateReceipt,
    ) -> Result<ReceiptWithItems, DocumentError> {
        let kind = DocumentKind::Receipt;
        let mut data = data.clone();
        data.receipt_number = required_number(kind, &data.receipt_number)?;

        if data.supplier_name.trim().is_empty() {
            return Err(DocumentError::validation("Supplier name is required"));
        }
        if data.items.is_empty() {
            return Err(DocumentError::validation("At least one item is required"));
        }
        if data.items.iter().any(|item| item.quantity <= 0) {
            return Err(DocumentError::validation(
                "Item quantities must be greater than zero",
            ));
        }
        if data
            .items
            .iter()
            .any(|item| item.unit_price.is_some_and(|price| price < 0.0))
        {
            return Err(DocumentError::validation("Unit price cannot be negative"));
        }
        self.ensure_warehouse(data.warehouse_id).await?;
        let product_ids: Vec<i64> = data.items.iter().map(|item| item.product_id).collect();
        self.ensure_products(&product_ids).await?;

        let now = self.clock.now();
        let mut attempt = 1;
        loop {
            let mut tx = self.pool.begin().await?;
            match Receipt::create(&mut *tx, &data, now).await {
                Ok(receipt) => {
                    tx.commit().await?;
                    info!(kind = %kind, id = receipt.id, number = %receipt.receipt_number, "document created");
                    return Ok(receipt);
                }
                Err(err) => {
                    drop(tx);
                    data.receipt_number = self
                        .retry_number(kind, data.receipt_number, attempt, err)
                        .await?;
                    attempt += 1;
                }
            }
        }
    }

    pub async fn create_transfer(
        &self,
        data: &CreateTransfer,
    ) -> Result<TransferWithItems, DocumentError> {
        let kind = DocumentKind::Transfer;
        let mut data = data.clone();
        data.transfer_number = required_number(kind, &data.transfer_number)?;

        if data.from_warehouse_id == data.to_warehouse_id {
            return Err(DocumentError::validation(
                "From and To warehouses must be different",
            ));
        }
        if data.items.iter().any(|item| item.quantity <= 0) {
            return Err(DocumentError::validation(
                "Item quantities must be greater than zero",
            ));
        }
        self.ensure_warehouse(data.from_warehouse_id).await?;
        self.ensure_warehouse(data.to_warehouse_id).await?;
        let product_ids: Vec<i64> = data.items.iter().map(|item| item.product_id).collect();
        self.ensure_products(&product_ids).await?;

        let now = self.clock.now();
        let mut attempt = 1;
        loop {
            let mut tx = self.pool.begin().await?;
            match Transfer::create(&mut *tx, &data, now).await {
                Ok(transfer) => {
                    tx.commit().await?;
                    info!(kind = %kind, id = transfer.id, number = %transfer.transfer_number, "document created");
                    return Ok(transfer);
                }
                Err(err) => {
                    drop(tx);
                    data.transfer_number = self
                        .retry_number(kind, data.transfer_number, attempt, err)
                        .await?;
                    attempt += 1;
                }
            }
        }
    }

    /// Mark a document done and apply its stock movement in one transaction
    pub async fn validate(&self, kind: DocumentKind, id: i64) -> Result<(), DocumentError> {
        let now = self.clock.now();
        let mut tx = self.pool.begin().await?;

        if !transition_status(&mut *tx, kind, id, DocumentStatus::Done, Some(now)).await? {
            drop(tx);
            return Err(self.rejected_transition(kind, id).await);
        }

        let not_found = || DocumentError::NotFound { kind, id };
        match kind {
            DocumentKind::Receipt => {
                let receipt = Receipt::find_by_id(&mut *tx, id).await?.ok_or_else(not_found)?;
                for item in Receipt::find_items(&mut *tx, id).await? {
                    move_stock(&mut *tx, item.product_id, receipt.warehouse_id, item.quantity, now)
                        .await?;
                }
            }
            DocumentKind::Delivery => {
                let delivery = Delivery::find_by_id(&mut *tx, id).await?.ok_or_else(not_found)?;
                for item in Delivery::find_items(&mut *tx, id).await? {
                    move_stock(&mut *tx, item.product_id, delivery.warehouse_id, -item.quantity, now)
                        .await?;
                }
            }
            DocumentKind::Transfer => {
                let transfer = Transfer::find_by_id(&mut *tx, id).await?.ok_or_else(not_found)?;
                for item in Transfer::find_items(&mut *tx, id).await? {
                    move_stock(
                        &mut *tx,
                        item.product_id,
                        transfer.from_warehouse_id,
                        -item.quantity,
                        now,
                    )
                    .await?;
                    move_stock(&mut *tx, item.product_id, transfer.to_warehouse_id, item.quantity, now)
                        .await?;
                }
            }
            DocumentKind::Adjustment => {
                let adjustment = Adjustment::find_by_id(&mut *tx, id)
                    .await?
                    .ok_or_else(not_found)?;
                move_stock(
                    &mut *tx,
                    adjustment.product_id,
                    adjustment.warehouse_id,
                    adjustment.difference,
                    now,
                )
                .await?;
            }
        }

        tx.commit().await?;
        info!(kind = %kind, id, "document validated");
        Ok(())
    }

    pub async fn cancel(&self, kind: DocumentKind, id: i64) -> Result<(), DocumentError> {
        let mut conn = self.pool.acquire().await?;
        let cancelled =
            transition_status(&mut conn, kind, id, DocumentStatus::Cancelled, None).await?;
        drop(conn);
        if !cancelled {
            return Err(self.rejected_transition(kind, id).await);
        }
        info!(kind = %kind, id, "document cancelled");
        Ok(())
    }

    /// Decide what a failed insert means. A number conflict with attempts left
    /// yields a freshly allocated number; anything else is returned as the error.
    async fn retry_number(
        &self,
        kind: DocumentKind,
        number: String,
        attempt: u32,
        err: sqlx::Error,
    ) -> Result<String, DocumentError> {
        if !is_number_conflict(&err, kind) {
            return Err(err.into());
        }
        if attempt >= self.insert_attempts {
            warn!(kind = %kind, number = %number, attempt, "document number conflict, giving up");
            return Err(DocumentError::DuplicateNumber { kind, number });
        }
        let fresh = self.allocate_number(kind).await?;
        warn!(
            kind = %kind,
            rejected = %number,
            retry_with = %fresh,
            attempt,
            "document number already taken, retrying with a fresh number"
        );
        Ok(fresh)
    }

    async fn rejected_transition(&self, kind: DocumentKind, id: i64) -> DocumentError {
        match find_status(&self.pool, kind, id).await {
            Ok(Some(status)) => DocumentError::InvalidStatus { kind, id, status },
            Ok(None) => DocumentError::NotFound { kind, id },
            Err(err) => err.into(),
        }
    }

    async fn ensure_warehouse(&self, id: i64) -> Result<(), DocumentError> {
        match Warehouse::find_by_id(&self.pool, id).await? {
            Some(_) => Ok(()),
            None => Err(DocumentError::validation(format!(
                "Warehouse {id} not found"
            ))),
        }
    }

    async fn ensure_products(&self, ids: &[i64]) -> Result<(), DocumentError> {
        let missing = Product::find_missing_ids(&self.pool, ids).await?;
        if missing.is_empty() {
            return Ok(());
        }
        let missing: Vec<String> = missing.iter().map(i64::to_string).collect();
        Err(DocumentError::validation(format!(
            "Product(s) not found: {}",
            missing.join(", ")
        )))
    }
}

#[derive(Clone, Copy)]
enum AdjustedProduct<'a> {
    Existing(i64),
    /// Created in the same transaction as the adjustment
    New(&'a str),
}

fn required_number(kind: DocumentKind, number: &str) -> Result<String, DocumentError> {
    let number = number.trim();
    if number.is_empty() {
        return Err(DocumentError::validation(format!("{kind} number is required")));
    }
    Ok(number.to_string())
}

fn quantity_out_of_range() -> DocumentError {
    DocumentError::validation("Quantity out of range")
}

/// Add `delta` to the stock of a product in a warehouse, refusing to go below zero
async fn move_stock(
    conn: &mut SqliteConnection,
    product_id: i64,
    warehouse_id: i64,
    delta: i64,
    now: DateTime<Utc>,
) -> Result<i64, DocumentError> {
    let available = StockLevel::quantity(conn, product_id, warehouse_id).await?;
    let quantity = available
        .checked_add(delta)
        .ok_or_else(quantity_out_of_range)?;
    if quantity < 0 {
        return Err(DocumentError::InsufficientStock {
            product_id,
            warehouse_id,
            available,
            requested: delta.saturating_neg(),
        });
    }
    StockLevel::set_quantity(conn, product_id, warehouse_id, quantity, now).await?;
    Ok(quantity)
}
