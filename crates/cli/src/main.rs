//! Interactive terminal client for the storefront HTTP API.

mod client;
mod console;

use std::io::{self, BufRead, Write};

use anyhow::{bail, Context};
use clap::Parser;

use client::{ApiClient, ClientError, NewOrderItem};
use console::{customers_table, orders_report, products_table, Console};

#[derive(Debug, Parser)]
#[command(name = "storefront", version, about = "Menu-driven client for the storefront API")]
struct Args {
    /// Base URL of a running storefront API.
    #[arg(long, env = "SERVER_URL", default_value = "http://localhost:8080")]
    base_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Choice {
    ListProducts,
    AddProduct,
    UpdateStock,
    ListCustomers,
    AddCustomer,
    CreateOrder,
    ViewOrders,
    Exit,
}

impl Choice {
    fn parse(raw: &str) -> Option<Self> {
        Some(match raw.trim() {
            "1" => Self::ListProducts,
            "2" => Self::AddProduct,
            "3" => Self::UpdateStock,
            "4" => Self::ListCustomers,
            "5" => Self::AddCustomer,
            "6" => Self::CreateOrder,
            "7" => Self::ViewOrders,
            "0" => Self::Exit,
            _ => return None,
        })
    }
}

const MENU: &str = "
=== Storefront ===
1) List products
2) Add product
3) Update stock
4) List customers
5) Add customer
6) Create order
7) View orders
0) Exit
";

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    storefront_observability::init_terminal();
    let args = Args::parse();

    let api = ApiClient::new(&args.base_url).context("failed to build HTTP client")?;
    if !api.server_up().await {
        bail!(
            "storefront API is not reachable at {} (is the server running?)",
            api.base_url()
        );
    }

    let stdin = io::stdin();
    let mut console = Console::new(stdin.lock(), io::stdout());
    match run_menu(&api, &mut console).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(()),
        Err(e) => Err(e.into()),
    }
}

async fn run_menu<R, W>(api: &ApiClient, console: &mut Console<R, W>) -> io::Result<()>
where
    R: BufRead,
    W: Write,
{
    loop {
        write!(console.out(), "{MENU}")?;
        let raw = console.prompt("Choose: ")?;
        let Some(choice) = Choice::parse(&raw) else {
            writeln!(console.out(), "Unknown option '{raw}'.")?;
            continue;
        };
        if choice == Choice::Exit {
            writeln!(console.out(), "Bye.")?;
            return Ok(());
        }

        if let Err(e) = dispatch(api, console, choice).await? {
            writeln!(console.out(), "Error: {e}")?;
        }
    }
}

/// Outer `Result` is terminal I/O, inner is the API call.
async fn dispatch<R, W>(
    api: &ApiClient,
    console: &mut Console<R, W>,
    choice: Choice,
) -> io::Result<Result<(), ClientError>>
where
    R: BufRead,
    W: Write,
{
    match choice {
        Choice::ListProducts => match api.list_products().await {
            Ok(products) => write!(console.out(), "{}", products_table(&products)).map(Ok),
            Err(e) => Ok(Err(e)),
        },
        Choice::AddProduct => {
            let name = console.prompt("Name: ")?;
            let price = console.prompt_price("Price: ")?;
            let stock = console.prompt_int("Stock: ")?;
            match api.create_product(&name, &price, stock).await {
                Ok(p) => writeln!(console.out(), "Created product #{} ({})", p.id, p.name).map(Ok),
                Err(e) => Ok(Err(e)),
            }
        }
        Choice::UpdateStock => {
            let id = console.prompt_int("Product id: ")?;
            let stock = console.prompt_int("New stock: ")?;
            match api.update_stock(id, stock).await {
                Ok(p) => writeln!(console.out(), "Product #{} stock is now {}", p.id, p.stock).map(Ok),
                Err(e) => Ok(Err(e)),
            }
        }
        Choice::ListCustomers => match api.list_customers().await {
            Ok(customers) => {
                write!(console.out(), "{}", customers_table(&customers)).map(Ok)
            }
            Err(e) => Ok(Err(e)),
        },
        Choice::AddCustomer => {
            let name = console.prompt("Name: ")?;
            let phone = console.prompt("Phone: ")?;
            match api.create_customer(&name, &phone).await {
                Ok(c) => writeln!(console.out(), "Created customer #{} ({})", c.id, c.name).map(Ok),
                Err(e) => Ok(Err(e)),
            }
        }
        Choice::CreateOrder => {
            let customer_id = console.prompt_int("Customer id: ")?;
            let items = collect_items(console)?;
            if items.is_empty() {
                writeln!(console.out(), "No items, order not placed.")?;
                return Ok(Ok(()));
            }
            match api.create_order(customer_id, &items).await {
                Ok(order) => writeln!(
                    console.out(),
                    "Created order #{} with {} items (total ${})",
                    order.id,
                    order.items.len(),
                    order.total.as_deref().unwrap_or("?")
                )
                .map(Ok),
                Err(e) => Ok(Err(e)),
            }
        }
        Choice::ViewOrders => match api.list_orders().await {
            Ok(orders) => write!(console.out(), "{}", orders_report(&orders)).map(Ok),
            Err(e) => Ok(Err(e)),
        },
        Choice::Exit => Ok(Ok(())),
    }
}

/// Prompt for product/quantity pairs until a blank product id.
fn collect_items<R, W>(console: &mut Console<R, W>) -> io::Result<Vec<NewOrderItem>>
where
    R: BufRead,
    W: Write,
{
    let mut items = Vec::new();
    while let Some(product_id) = console.prompt_optional_int("Product id (blank to finish): ")? {
        let qty = console.prompt_int("Quantity: ")?;
        items.push(NewOrderItem { product_id, qty });
    }
    Ok(items)
}
