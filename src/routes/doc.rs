use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        cart::{AddToCartRequest, CartContents, CartLineView, CartTotals},
        orders::{OrderList, OrderTotals, OrderWithLines, UpdateOrderStatusRequest},
        payments::{CancellationOutcome, CardPaymentRequest, PaymentOutcome},
    },
    models::{CartLine, Item, Order, OrderLine, OrderStatus, Payment, PaymentStatus},
    response::{ApiResponse, Meta},
    routes::{admin, cart, health, items, orders, params, payments},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        items::list_items,
        items::get_item,
        cart::view_cart,
        cart::add_to_cart,
        cart::remove_line,
        cart::clear_cart,
        orders::list_orders,
        orders::checkout,
        orders::get_order,
        orders::pay_order,
        payments::cancel_payment,
        admin::update_order_status
    ),
    components(
        schemas(
            Item,
            CartLine,
            Order,
            OrderLine,
            Payment,
            OrderStatus,
            PaymentStatus,
            AddToCartRequest,
            CartLineView,
            CartTotals,
            CartContents,
            OrderList,
            OrderTotals,
            OrderWithLines,
            UpdateOrderStatusRequest,
            CardPaymentRequest,
            PaymentOutcome,
            CancellationOutcome,
            items::ItemList,
            params::Pagination,
            Meta,
            ApiResponse<Item>,
            ApiResponse<CartContents>,
            ApiResponse<OrderWithLines>,
            ApiResponse<OrderList>,
            ApiResponse<PaymentOutcome>,
            ApiResponse<CancellationOutcome>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Items", description = "Catalog and stock endpoints"),
        (name = "Cart", description = "Cart endpoints"),
        (name = "Orders", description = "Checkout and order endpoints"),
        (name = "Payments", description = "Payment and cancellation endpoints"),
        (name = "Admin", description = "Admin endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
