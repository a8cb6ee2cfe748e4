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
        analytics::{DashboardStats, PopularProduct, PopularProductList},
        auth::{
            LoginRequest, LoginResponse, RegisterRequest, UpdateUserRoleRequest,
            UpdateUserStatusRequest, UserList,
        },
        cart::{AddToCartRequest, CartCount, CartValidation, UpdateCartItemRequest},
        orders::{
            CreateOrderRequest, OrderList, OrderWithItems, UpdateOrderStatusRequest,
            UserOrderStats,
        },
        products::{
            InventoryAdjustRequest, ProductList, ProductRequest, ProductTypeList,
            RatingUpdateRequest, StatusUpdateRequest, StockUpdateRequest,
        },
    },
    models::{Cart, CartItem, Order, OrderItem, Product, User},
    response::{ApiResponse, Meta},
    routes::{admin, auth, cart, health, orders, params, products as product_routes, seller},
    status::{AccountStatus, OrderStatus, ProductStatus, UserRole},
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
        auth::login,
        auth::register,
        auth::me,
        auth::list_users,
        auth::update_user_status,
        auth::update_user_role,
        product_routes::list_products,
        product_routes::list_types,
        product_routes::top_eco,
        product_routes::list_low_stock,
        product_routes::list_my_products,
        product_routes::get_product,
        product_routes::create_product,
        product_routes::update_product,
        product_routes::update_stock,
        product_routes::update_status,
        product_routes::update_rating,
        product_routes::delete_product,
        cart::get_cart,
        cart::add_item,
        cart::update_item,
        cart::remove_item,
        cart::clear_cart,
        cart::item_count,
        cart::validate_cart,
        orders::list_orders,
        orders::create_order,
        orders::buy_now,
        orders::recent_orders,
        orders::order_stats,
        orders::get_by_tracking,
        orders::get_order,
        orders::cancel_order,
        orders::update_status,
        seller::list_seller_orders,
        seller::update_item_status,
        admin::list_all_orders,
        admin::list_orders_by_status,
        admin::get_order_admin,
        admin::update_order_status,
        admin::list_low_stock,
        admin::adjust_inventory,
        admin::dashboard,
        admin::popular_products
    ),
    components(
        schemas(
            User,
            Product,
            Cart,
            CartItem,
            Order,
            OrderItem,
            OrderStatus,
            ProductStatus,
            UserRole,
            AccountStatus,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            UserList,
            UpdateUserStatusRequest,
            UpdateUserRoleRequest,
            ProductRequest,
            StockUpdateRequest,
            StatusUpdateRequest,
            RatingUpdateRequest,
            InventoryAdjustRequest,
            AddToCartRequest,
            UpdateCartItemRequest,
            CartCount,
            CartValidation,
            CreateOrderRequest,
            UpdateOrderStatusRequest,
            UserOrderStats,
            DashboardStats,
            PopularProduct,
            PopularProductList,
            ProductList,
            ProductTypeList,
            OrderList,
            OrderWithItems,
            params::Pagination,
            params::ProductQuery,
            params::OrderListQuery,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<Cart>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Products", description = "Catalog endpoints"),
        (name = "Cart", description = "Cart endpoints"),
        (name = "Orders", description = "Consumer order endpoints"),
        (name = "Seller", description = "Seller order endpoints"),
        (name = "Admin", description = "Admin order, inventory and analytics endpoints"),
        (name = "Auth", description = "Authentication and account management endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_core_paths() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/cart",
            "/api/orders",
            "/api/orders/{id}/cancel",
            "/api/seller/orders/{id}/status",
            "/api/admin/orders/{id}/status",
            "/api/auth/me",
            "/api/auth/admin/{id}/status",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
