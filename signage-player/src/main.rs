use signage_player::run_cli;
use signage_player::util::shutdown::cancel_on_ctrl_c;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cancel_on_ctrl_c();
    run_cli().await
}
