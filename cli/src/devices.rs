use clap::Args;

use applist::adb::{Adb, ExecAdb};
use applist::Context;

use crate::printer::Printer;

#[derive(Args)]
pub struct Devices {}

impl Devices {
    pub fn run(&self, ctx: &dyn Context) -> anyhow::Result<()> {
        let adb = ExecAdb::new(ctx)?;
        let printer = Printer::new();
        for serial in adb.get_connected_devices()? {
            printer.println(serial);
        }
        Ok(())
    }
}
