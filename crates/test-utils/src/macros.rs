/// Generates an async test with a fresh [`TestProject`](crate::TestProject) and a
/// [`MockWallet`](crate::MockWallet) whose contract lives at the project's deployed address.
///
/// # Example
///
/// ```no_run
/// use petshop_test_utils::*;
/// petshoptest!(lists_pets, |prj, wallet| {
///     wallet.set_adopted([1]);
///     assert_eq!(prj.catalog().len(), 5);
/// });
/// ```
#[macro_export]
macro_rules! petshoptest {
    ($(#[$attr:meta])* $test:ident, |$prj:ident, $wallet:ident| $e:expr) => {
        #[tokio::test]
        $(#[$attr])*
        async fn $test() {
            $crate::init_tracing();
            #[allow(unused_mut)]
            let (mut $prj, $wallet) = $crate::TestProject::with_wallet(stringify!($test));
            $e
        }
    };
}
