//! # Checkout Module
//!
//! The cart/checkout calculator: builds a transaction from selected catalog
//! lines, totals it in both currencies, and computes change across the four
//! tender/change currency combinations.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Checkout Lifecycle                                 │
//! │                                                                         │
//! │  Checkout::for_appointment(...)          (Building)                    │
//! │       │                                                                 │
//! │       ├── add_line() / remove_line() / set_line_price()                │
//! │       │        ▲                                                        │
//! │       │        └── totals() / change_due() are pure reads,             │
//! │       │            callable at any point while building                 │
//! │       ▼                                                                 │
//! │  finalize(self, rate, payment)                                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  FinalizedSale                           (immutable snapshot)          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SaleRepository::record() - one transaction, all-or-nothing            │
//! │                                                                         │
//! │  finalize takes `self` BY VALUE: once a checkout is finalized the      │
//! │  Building state no longer exists, so the compiler enforces the         │
//! │  transition. Abandoning a cart is just dropping it.                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Price Snapshots
//! A cart line copies the price at add time. Editing the catalog after the
//! fact - or overriding the line price for a manual discount - never reaches
//! back into the catalog, and the catalog never reaches into the cart.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::{Currency, ExchangeRate, Money};
use crate::types::{Appointment, CatalogItem, ItemKind, PaymentMethod};
use crate::validation::{validate_cart_size, validate_quantity};

// =============================================================================
// Appointment Context
// =============================================================================

/// The slice of an appointment a checkout needs to carry: who gets the
/// commission, who is paying, and which appointment to settle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentRef {
    pub appointment_id: String,
    pub stylist_id: String,
    pub client_id: String,
}

impl From<&Appointment> for AppointmentRef {
    fn from(appt: &Appointment) -> Self {
        AppointmentRef {
            appointment_id: appt.id.clone(),
            stylist_id: appt.stylist_id.clone(),
            client_id: appt.client_id.clone(),
        }
    }
}

// =============================================================================
// Cart Line
// =============================================================================

/// A line in an in-progress checkout.
///
/// Ephemeral: created when an item is added, gone when the checkout is
/// finalized or dropped. `unit_price_cents` is a copy captured at add time
/// and independently editable for manual discounts or surcharges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLine {
    /// Per-checkout line id, used to address edits and removals.
    pub line_id: u64,

    /// The catalog item this line was created from.
    pub item_id: String,

    /// Display name at time of adding (frozen).
    pub name: String,

    /// Unit price in MXN cents at time of adding (frozen, but editable
    /// through [`Checkout::set_line_price`]).
    pub unit_price_cents: i64,

    pub quantity: i64,

    /// Kind at time of adding (frozen).
    pub kind: ItemKind,
}

impl CartLine {
    /// unit price * quantity, in MXN cents. Exact integer arithmetic.
    pub fn subtotal_cents(&self) -> i64 {
        self.unit_price_cents * self.quantity
    }

    /// Returns the line subtotal as Money.
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents())
    }
}

// =============================================================================
// Totals
// =============================================================================

/// Both-currency totals of a checkout. Handed to the register display.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutTotals {
    pub total_mxn: Money,
    pub total_usd: Money,
}

impl CheckoutTotals {
    /// The amount due in the currency the client is paying with.
    pub fn due_in(&self, currency: Currency) -> Money {
        match currency {
            Currency::Mxn => self.total_mxn,
            Currency::Usd => self.total_usd,
        }
    }
}

// =============================================================================
// Payment Details
// =============================================================================

/// How the client is settling the finalized checkout.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetails {
    pub method: PaymentMethod,
    /// Amount handed over, in `tender_currency`.
    pub tendered: Money,
    pub tender_currency: Currency,
    /// Currency the change should be handed back in.
    pub change_currency: Currency,
}

// =============================================================================
// Checkout (Building state)
// =============================================================================

/// An in-progress checkout. Mutable until [`finalize`](Self::finalize)
/// consumes it.
#[derive(Debug, Clone, Default)]
pub struct Checkout {
    appointment: Option<AppointmentRef>,
    lines: Vec<CartLine>,
    next_line_id: u64,
}

impl Checkout {
    /// Creates an empty, unbound checkout.
    ///
    /// Finalizing in this state fails; bind an appointment with
    /// [`for_appointment`](Self::for_appointment) for the normal flow.
    pub fn new() -> Self {
        Checkout::default()
    }

    /// Starts a checkout for an appointment, seeding the first line from the
    /// booked service.
    ///
    /// The line price is the price recorded on the appointment when one
    /// exists, else the current catalog price. Either way it is frozen into
    /// the line from here on.
    pub fn for_appointment(appointment: &Appointment, service: &CatalogItem) -> Self {
        let price = appointment.booked_price().unwrap_or_else(|| service.price());
        let mut checkout = Checkout {
            appointment: Some(AppointmentRef::from(appointment)),
            lines: Vec::new(),
            next_line_id: 0,
        };
        checkout.push_line(service, 1, price);
        checkout
    }

    /// The appointment this checkout settles, if bound.
    pub fn appointment(&self) -> Option<&AppointmentRef> {
        self.appointment.as_ref()
    }

    /// Lines currently in the cart.
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Checks if the cart has no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Appends a line for a catalog item.
    ///
    /// ## Arguments
    /// * `item` - the catalog entry; name, kind and (absent an override) the
    ///   price are snapshotted from it
    /// * `quantity` - units sold, 1..=999
    /// * `override_price` - replaces the catalog price for this line
    ///
    /// ## Errors
    /// - `InvalidAmount` when the override price is negative
    /// - `Validation` when the quantity is out of range or the cart is full
    ///
    /// ## Returns
    /// The id of the new line, usable with `set_line_price`/`remove_line`.
    pub fn add_line(
        &mut self,
        item: &CatalogItem,
        quantity: i64,
        override_price: Option<Money>,
    ) -> CoreResult<u64> {
        validate_quantity(quantity)?;
        validate_cart_size(self.lines.len())?;

        if let Some(price) = override_price {
            if price.is_negative() {
                return Err(CoreError::InvalidAmount {
                    cents: price.cents(),
                });
            }
        }

        let price = override_price.unwrap_or_else(|| item.price());
        Ok(self.push_line(item, quantity, price))
    }

    /// Removes a line. Valid while building only - the type system takes
    /// care of "only", this method takes care of unknown ids.
    pub fn remove_line(&mut self, line_id: u64) -> CoreResult<()> {
        let before = self.lines.len();
        self.lines.retain(|l| l.line_id != line_id);

        if self.lines.len() == before {
            Err(CoreError::LineNotFound(line_id))
        } else {
            Ok(())
        }
    }

    /// Overrides a line's unit price for a manual discount or surcharge.
    ///
    /// ## Errors
    /// - `InvalidAmount` when the new price is negative (zero is allowed -
    ///   courtesy services happen)
    /// - `LineNotFound` when the id does not exist
    pub fn set_line_price(&mut self, line_id: u64, new_price: Money) -> CoreResult<()> {
        if new_price.is_negative() {
            return Err(CoreError::InvalidAmount {
                cents: new_price.cents(),
            });
        }

        match self.lines.iter_mut().find(|l| l.line_id == line_id) {
            Some(line) => {
                line.unit_price_cents = new_price.cents();
                Ok(())
            }
            None => Err(CoreError::LineNotFound(line_id)),
        }
    }

    /// Computes both-currency totals.
    ///
    /// Pure and repeatable: call it after every cart mutation. The MXN total
    /// is the exact integer sum of the line subtotals; only the USD figure
    /// passes through the (rounding) conversion.
    pub fn totals(&self, rate: ExchangeRate) -> CheckoutTotals {
        let total_mxn = Money::from_cents(self.lines.iter().map(|l| l.subtotal_cents()).sum());
        CheckoutTotals {
            total_mxn,
            total_usd: rate.to_usd(total_mxn),
        }
    }

    /// Computes the change due for a tendered amount.
    ///
    /// ```text
    /// due        = total in the tender currency
    /// raw change = tendered - due          (in the tender currency)
    /// change     = raw change converted to the change currency
    /// ```
    ///
    /// Under-payment yields zero change, never a negative amount; the sale
    /// is accepted as-is and the register shows the shortfall.
    ///
    /// All four (tender, change) currency combinations are supported:
    /// MXN/MXN and USD/USD are identity conversions, MXN->USD divides by the
    /// rate, USD->MXN multiplies.
    pub fn change_due(
        &self,
        tendered: Money,
        tender_currency: Currency,
        change_currency: Currency,
        rate: ExchangeRate,
    ) -> Money {
        let due = self.totals(rate).due_in(tender_currency);
        if tendered < due {
            return Money::zero();
        }
        rate.convert(tendered - due, tender_currency, change_currency)
    }

    /// Transitions Building -> Finalized, consuming the checkout.
    ///
    /// ## Errors
    /// - `EmptyCart` when there are no lines
    /// - `NoStylistOrClient` when no appointment is bound (checkout in this
    ///   domain always settles an appointment)
    /// - `InvalidAmount` when the tendered amount is negative
    ///
    /// ## Returns
    /// An immutable [`FinalizedSale`] snapshot for the Transaction Recorder,
    /// with totals and change fixed at the rate passed in.
    pub fn finalize(self, rate: ExchangeRate, payment: PaymentDetails) -> CoreResult<FinalizedSale> {
        if self.lines.is_empty() {
            return Err(CoreError::EmptyCart);
        }
        let appointment = self.appointment.clone().ok_or(CoreError::NoStylistOrClient)?;
        if payment.tendered.is_negative() {
            return Err(CoreError::InvalidAmount {
                cents: payment.tendered.cents(),
            });
        }

        let totals = self.totals(rate);
        let change = self.change_due(
            payment.tendered,
            payment.tender_currency,
            payment.change_currency,
            rate,
        );

        Ok(FinalizedSale {
            appointment_id: appointment.appointment_id,
            stylist_id: appointment.stylist_id,
            client_id: appointment.client_id,
            total_mxn: totals.total_mxn,
            total_usd: totals.total_usd,
            payment_method: payment.method,
            tender_currency: payment.tender_currency,
            change_currency: payment.change_currency,
            tendered: payment.tendered,
            change,
            lines: self.lines,
        })
    }

    fn push_line(&mut self, item: &CatalogItem, quantity: i64, price: Money) -> u64 {
        let line_id = self.next_line_id;
        self.next_line_id += 1;
        self.lines.push(CartLine {
            line_id,
            item_id: item.id.clone(),
            name: item.name.clone(),
            unit_price_cents: price.cents(),
            quantity,
            kind: item.kind,
        });
        line_id
    }
}

// =============================================================================
// Finalized Sale (snapshot)
// =============================================================================

/// The immutable result of a finalized checkout.
///
/// This is what the Transaction Recorder persists; nothing here can be
/// edited, only recorded or dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalizedSale {
    pub appointment_id: String,
    pub stylist_id: String,
    pub client_id: String,
    pub total_mxn: Money,
    pub total_usd: Money,
    pub payment_method: PaymentMethod,
    pub tender_currency: Currency,
    pub change_currency: Currency,
    pub tendered: Money,
    pub change: Money,
    pub lines: Vec<CartLine>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AppointmentStatus;
    use chrono::Utc;

    fn rate() -> ExchangeRate {
        ExchangeRate::from_milli(18500).unwrap()
    }

    fn service(id: &str, price_cents: i64) -> CatalogItem {
        CatalogItem {
            id: id.to_string(),
            name: format!("Servicio {}", id),
            kind: ItemKind::Service,
            sale_price_cents: price_cents,
            purchase_cost_cents: 0,
            current_stock: None,
            minimum_stock: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn product(id: &str, price_cents: i64) -> CatalogItem {
        CatalogItem {
            kind: ItemKind::Product,
            current_stock: Some(10),
            minimum_stock: Some(3),
            purchase_cost_cents: price_cents / 2,
            ..service(id, price_cents)
        }
    }

    fn appointment(service_id: &str, booked_price_cents: Option<i64>) -> Appointment {
        Appointment {
            id: "appt-1".to_string(),
            stylist_id: "sty-1".to_string(),
            client_id: "cli-1".to_string(),
            service_id: service_id.to_string(),
            booked_price_cents,
            status: AppointmentStatus::Scheduled,
            starts_at: Utc::now(),
            created_at: Utc::now(),
        }
    }

    fn cash(tendered_cents: i64, tender: Currency, change: Currency) -> PaymentDetails {
        PaymentDetails {
            method: PaymentMethod::Cash,
            tendered: Money::from_cents(tendered_cents),
            tender_currency: tender,
            change_currency: change,
        }
    }

    #[test]
    fn test_first_line_comes_from_the_booked_service() {
        let svc = service("corte", 35000);
        let checkout = Checkout::for_appointment(&appointment("corte", None), &svc);

        assert_eq!(checkout.lines().len(), 1);
        assert_eq!(checkout.lines()[0].item_id, "corte");
        assert_eq!(checkout.lines()[0].unit_price_cents, 35000);
    }

    #[test]
    fn test_booked_price_wins_over_catalog_price() {
        let svc = service("corte", 35000);
        let checkout = Checkout::for_appointment(&appointment("corte", Some(30000)), &svc);

        assert_eq!(checkout.lines()[0].unit_price_cents, 30000);
    }

    #[test]
    fn test_totals_match_sum_of_subtotals_exactly() {
        let svc = service("corte", 35000);
        let mut checkout = Checkout::for_appointment(&appointment("corte", None), &svc);
        checkout.add_line(&product("cera", 25000), 2, None).unwrap();
        checkout
            .add_line(&service("peinado", 20000), 1, Some(Money::from_cents(18000)))
            .unwrap();

        let totals = checkout.totals(rate());
        let sum: i64 = checkout.lines().iter().map(|l| l.subtotal_cents()).sum();
        assert_eq!(totals.total_mxn.cents(), sum);
        assert_eq!(totals.total_mxn.cents(), 35000 + 50000 + 18000);
    }

    #[test]
    fn test_usd_total_is_converted_once() {
        let svc = service("corte", 10000); // $100.00 MXN
        let checkout = Checkout::for_appointment(&appointment("corte", None), &svc);

        let totals = checkout.totals(rate());
        // 100 / 18.5 = 5.4054... -> $5.41
        assert_eq!(totals.total_usd.cents(), 541);
    }

    #[test]
    fn test_change_mxn_tender_mxn_change() {
        let svc = service("corte", 10000);
        let checkout = Checkout::for_appointment(&appointment("corte", None), &svc);

        let change = checkout.change_due(
            Money::from_cents(15000),
            Currency::Mxn,
            Currency::Mxn,
            rate(),
        );
        assert_eq!(change.cents(), 5000);
    }

    #[test]
    fn test_change_mxn_tender_usd_change() {
        let svc = service("corte", 10000);
        let checkout = Checkout::for_appointment(&appointment("corte", None), &svc);

        // 50.00 MXN over / 18.5 = $2.70 USD
        let change = checkout.change_due(
            Money::from_cents(15000),
            Currency::Mxn,
            Currency::Usd,
            rate(),
        );
        assert_eq!(change.cents(), 270);
    }

    #[test]
    fn test_change_usd_tender_mxn_change() {
        let svc = service("corte", 10000);
        let checkout = Checkout::for_appointment(&appointment("corte", None), &svc);

        // due = $5.41 USD; $10 tendered leaves $4.59 USD * 18.5 = $84.92 MXN
        let change = checkout.change_due(
            Money::from_cents(1000),
            Currency::Usd,
            Currency::Mxn,
            rate(),
        );
        assert_eq!(change.cents(), 8492);
    }

    #[test]
    fn test_change_usd_tender_usd_change() {
        let svc = service("corte", 10000);
        let checkout = Checkout::for_appointment(&appointment("corte", None), &svc);

        let change = checkout.change_due(
            Money::from_cents(1000),
            Currency::Usd,
            Currency::Usd,
            rate(),
        );
        assert_eq!(change.cents(), 459);
    }

    #[test]
    fn test_under_payment_yields_zero_change() {
        let svc = service("corte", 10000);
        let checkout = Checkout::for_appointment(&appointment("corte", None), &svc);

        let change = checkout.change_due(
            Money::from_cents(5000),
            Currency::Mxn,
            Currency::Mxn,
            rate(),
        );
        assert!(change.is_zero());
    }

    #[test]
    fn test_negative_override_price_is_rejected() {
        let svc = service("corte", 35000);
        let mut checkout = Checkout::for_appointment(&appointment("corte", None), &svc);

        let err = checkout
            .add_line(&product("cera", 25000), 1, Some(Money::from_cents(-100)))
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidAmount { cents: -100 }));
        assert_eq!(checkout.lines().len(), 1);
    }

    #[test]
    fn test_set_line_price_applies_manual_discount() {
        let svc = service("corte", 35000);
        let mut checkout = Checkout::for_appointment(&appointment("corte", None), &svc);
        let line_id = checkout.lines()[0].line_id;

        checkout
            .set_line_price(line_id, Money::from_cents(30000))
            .unwrap();
        assert_eq!(checkout.totals(rate()).total_mxn.cents(), 30000);

        let err = checkout
            .set_line_price(line_id, Money::from_cents(-1))
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidAmount { .. }));

        assert!(matches!(
            checkout.set_line_price(999, Money::from_cents(100)),
            Err(CoreError::LineNotFound(999))
        ));
    }

    #[test]
    fn test_remove_line() {
        let svc = service("corte", 35000);
        let mut checkout = Checkout::for_appointment(&appointment("corte", None), &svc);
        let extra = checkout.add_line(&product("cera", 25000), 1, None).unwrap();

        checkout.remove_line(extra).unwrap();
        assert_eq!(checkout.lines().len(), 1);
        assert!(matches!(
            checkout.remove_line(extra),
            Err(CoreError::LineNotFound(_))
        ));
    }

    #[test]
    fn test_finalize_empty_cart_fails() {
        let checkout = Checkout::new();
        let err = checkout
            .finalize(rate(), cash(10000, Currency::Mxn, Currency::Mxn))
            .unwrap_err();
        assert!(matches!(err, CoreError::EmptyCart));
    }

    #[test]
    fn test_finalize_without_appointment_fails() {
        let mut checkout = Checkout::new();
        checkout.add_line(&service("corte", 35000), 1, None).unwrap();

        let err = checkout
            .finalize(rate(), cash(35000, Currency::Mxn, Currency::Mxn))
            .unwrap_err();
        assert!(matches!(err, CoreError::NoStylistOrClient));
    }

    #[test]
    fn test_finalize_snapshot() {
        let svc = service("corte", 10000);
        let checkout = Checkout::for_appointment(&appointment("corte", None), &svc);

        let sale = checkout
            .finalize(rate(), cash(15000, Currency::Mxn, Currency::Mxn))
            .unwrap();

        assert_eq!(sale.appointment_id, "appt-1");
        assert_eq!(sale.stylist_id, "sty-1");
        assert_eq!(sale.total_mxn.cents(), 10000);
        assert_eq!(sale.total_usd.cents(), 541);
        assert_eq!(sale.change.cents(), 5000);
        assert_eq!(sale.lines.len(), 1);
    }

    #[test]
    fn test_finalize_rejects_negative_tender() {
        let svc = service("corte", 10000);
        let checkout = Checkout::for_appointment(&appointment("corte", None), &svc);

        let err = checkout
            .finalize(rate(), cash(-1, Currency::Mxn, Currency::Mxn))
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidAmount { cents: -1 }));
    }
}
