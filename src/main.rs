#[actix_web::main]
async fn main() -> std::io::Result<()> {
    naics_tam_lib::run().await
}
