#[actix_web::main]
async fn main() -> std::io::Result<()> {
    carrier_portal_server::run().await
}
